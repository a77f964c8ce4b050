//! Entity store: persistence of books, members and borrowing records.
//!
//! Every write re-runs the rules in [`crate::rules`] before committing, and borrowing
//! writes drive [`crate::lifecycle`] inside the same critical section as the record
//! write. A failed write leaves stored state unchanged.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::{ensure_database_exists, PgStore};

use crate::config::DatabaseConfig;
use crate::error::{AppError, AppResult};
use crate::model::{Book, BookInput, BorrowingInput, BorrowingRecord, Member, MemberInput};
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;

#[async_trait]
pub trait LibraryStore: Send + Sync {
    /// Cheap round trip used by the readiness probe.
    async fn ping(&self) -> AppResult<()>;

    async fn count_books(&self) -> AppResult<u64>;
    /// Books ordered by id.
    async fn list_books(&self, offset: u64, limit: u64) -> AppResult<Vec<Book>>;
    async fn get_book(&self, id: i64) -> AppResult<Option<Book>>;
    async fn create_book(&self, input: BookInput) -> AppResult<Book>;
    /// Replace writable fields. `None` when the book does not exist.
    async fn replace_book(&self, id: i64, input: BookInput) -> AppResult<Option<Book>>;
    /// Delete the book and its borrowing records. `false` when it did not exist.
    async fn delete_book(&self, id: i64) -> AppResult<bool>;

    async fn count_members(&self) -> AppResult<u64>;
    async fn list_members(&self, offset: u64, limit: u64) -> AppResult<Vec<Member>>;
    async fn get_member(&self, id: i64) -> AppResult<Option<Member>>;
    async fn create_member(&self, input: MemberInput) -> AppResult<Member>;
    async fn replace_member(&self, id: i64, input: MemberInput) -> AppResult<Option<Member>>;
    async fn delete_member(&self, id: i64) -> AppResult<bool>;

    /// All borrowing records ordered by id, unpaginated.
    async fn list_borrowings(&self) -> AppResult<Vec<BorrowingRecord>>;
    async fn get_borrowing(&self, id: i64) -> AppResult<Option<BorrowingRecord>>;
    /// Lend a book: fails when the book is unavailable, otherwise marks it unavailable.
    async fn create_borrowing(&self, input: BorrowingInput) -> AppResult<BorrowingRecord>;
    /// Replace a record; a first returned date marks the book available again, and
    /// clearing a returned date is rejected.
    async fn replace_borrowing(&self, id: i64, input: BorrowingInput) -> AppResult<Option<BorrowingRecord>>;
    async fn delete_borrowing(&self, id: i64) -> AppResult<bool>;
}

/// Open the configured backend: PostgreSQL when a database is configured (creating the
/// database, schema and tables as needed), otherwise an empty in-memory store.
pub async fn open(database: Option<&DatabaseConfig>) -> AppResult<Arc<dyn LibraryStore>> {
    let Some(db) = database else {
        tracing::warn!("DATABASE_URL not set, using in-memory store; data is lost on exit");
        return Ok(Arc::new(MemoryStore::new()));
    };
    ensure_database_exists(&db.url).await?;
    let pool = PgPoolOptions::new()
        .max_connections(db.max_connections)
        .connect(&db.url)
        .await?;
    let store = PgStore::new(pool, db.schema.clone());
    store.ensure_tables().await?;
    tracing::info!(schema = %db.schema, "postgres store ready");
    Ok(Arc::new(store))
}

pub(crate) fn missing_reference(field: &str, id: i64) -> AppError {
    AppError::validation(field, format!("Invalid pk \"{}\" - object does not exist.", id))
}

/// The book and member of an existing record are fixed once it is created.
pub(crate) fn check_references_unchanged(record: &BorrowingRecord, input: &BorrowingInput) -> AppResult<()> {
    if record.book_id != input.book_id {
        return Err(AppError::validation("book", "The book of an existing borrowing record cannot be changed."));
    }
    if record.member_id != input.member_id {
        return Err(AppError::validation("member", "The member of an existing borrowing record cannot be changed."));
    }
    Ok(())
}
