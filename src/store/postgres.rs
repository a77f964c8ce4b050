//! PostgreSQL store. Tables live in a schema named by `LIBRARY_SCHEMA` (default `library`).

use super::{check_references_unchanged, missing_reference, LibraryStore};
use crate::error::{AppError, AppResult};
use crate::lifecycle;
use crate::model::{Book, BookInput, BorrowingInput, BorrowingRecord, Member, MemberInput};
use crate::rules::{self, DUPLICATE_EMAIL};
use async_trait::async_trait;
use sqlx::ConnectOptions;
use sqlx::PgPool;
use std::str::FromStr;

const BOOK_COLUMNS: &str = "id, title, author, published_date, category, is_available, created_at";
const MEMBER_COLUMNS: &str = "id, name, email, joined_date";
const BORROWING_COLUMNS: &str = "id, book_id, member_id, borrowed_date, returned_date";

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Duplicate emails surface as a conflict on `email`; anything else stays a database fault.
fn map_member_write(e: sqlx::Error) -> AppError {
    if e.as_database_error().map(|d| d.is_unique_violation()).unwrap_or(false) {
        return AppError::conflict("email", DUPLICATE_EMAIL);
    }
    AppError::Db(e)
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
    schema: String,
}

impl PgStore {
    pub fn new(pool: PgPool, schema: impl Into<String>) -> Self {
        PgStore {
            pool,
            schema: schema.into(),
        }
    }

    /// Schema-qualified table name, e.g. `"library"."books"`.
    fn table(&self, name: &str) -> String {
        format!("{}.{}", quote_ident(&self.schema), quote_ident(name))
    }

    /// Create the schema and tables if missing. Idempotent.
    pub async fn ensure_tables(&self) -> AppResult<()> {
        sqlx::query(&format!("CREATE SCHEMA IF NOT EXISTS {}", quote_ident(&self.schema)))
            .execute(&self.pool)
            .await?;

        let books = self.table("books");
        let members = self.table("members");
        let borrowings = self.table("borrowing_records");

        let books_ddl = format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                id BIGSERIAL PRIMARY KEY,
                title VARCHAR(255) NOT NULL,
                author VARCHAR(255) NOT NULL,
                published_date DATE NOT NULL,
                category VARCHAR(100) NOT NULL,
                is_available BOOLEAN NOT NULL DEFAULT TRUE,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
            books
        );
        sqlx::query(&books_ddl).execute(&self.pool).await?;

        let members_ddl = format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                id BIGSERIAL PRIMARY KEY,
                name VARCHAR(255) NOT NULL,
                email VARCHAR(254) NOT NULL UNIQUE,
                joined_date DATE NOT NULL DEFAULT CURRENT_DATE
            )
            "#,
            members
        );
        sqlx::query(&members_ddl).execute(&self.pool).await?;

        let borrowings_ddl = format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                id BIGSERIAL PRIMARY KEY,
                book_id BIGINT NOT NULL REFERENCES {}(id) ON DELETE CASCADE,
                member_id BIGINT NOT NULL REFERENCES {}(id) ON DELETE CASCADE,
                borrowed_date DATE NOT NULL DEFAULT CURRENT_DATE,
                returned_date DATE NULL,
                CONSTRAINT borrowing_return_order CHECK (returned_date IS NULL OR returned_date >= borrowed_date)
            )
            "#,
            borrowings, books, members
        );
        sqlx::query(&borrowings_ddl).execute(&self.pool).await?;

        for (index, column) in [("borrowing_records_book_idx", "book_id"), ("borrowing_records_member_idx", "member_id")] {
            let sql = format!(
                "CREATE INDEX IF NOT EXISTS {} ON {} ({})",
                quote_ident(index),
                borrowings,
                column
            );
            sqlx::query(&sql).execute(&self.pool).await?;
        }
        Ok(())
    }

    async fn count(&self, table: &str) -> AppResult<u64> {
        let sql = format!("SELECT COUNT(*) FROM {}", self.table(table));
        let n: i64 = sqlx::query_scalar(&sql).fetch_one(&self.pool).await?;
        Ok(n.max(0) as u64)
    }

    async fn delete_by_id(&self, table: &str, id: i64) -> AppResult<bool> {
        let sql = format!("DELETE FROM {} WHERE id = $1", self.table(table));
        let done = sqlx::query(&sql).bind(id).execute(&self.pool).await?;
        Ok(done.rows_affected() > 0)
    }
}

#[async_trait]
impl LibraryStore for PgStore {
    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").fetch_optional(&self.pool).await?;
        Ok(())
    }

    async fn count_books(&self) -> AppResult<u64> {
        self.count("books").await
    }

    async fn list_books(&self, offset: u64, limit: u64) -> AppResult<Vec<Book>> {
        let sql = format!(
            "SELECT {} FROM {} ORDER BY id LIMIT $1 OFFSET $2",
            BOOK_COLUMNS,
            self.table("books")
        );
        tracing::debug!(sql = %sql, offset, limit, "query");
        let rows = sqlx::query_as::<_, Book>(&sql)
            .bind(limit as i64)
            .bind(offset as i64)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn get_book(&self, id: i64) -> AppResult<Option<Book>> {
        let sql = format!("SELECT {} FROM {} WHERE id = $1", BOOK_COLUMNS, self.table("books"));
        Ok(sqlx::query_as::<_, Book>(&sql).bind(id).fetch_optional(&self.pool).await?)
    }

    async fn create_book(&self, input: BookInput) -> AppResult<Book> {
        rules::check_book(&input, rules::today())?;
        let sql = format!(
            "INSERT INTO {} (title, author, published_date, category, is_available) VALUES ($1, $2, $3, $4, $5) RETURNING {}",
            self.table("books"),
            BOOK_COLUMNS
        );
        let book = sqlx::query_as::<_, Book>(&sql)
            .bind(&input.title)
            .bind(&input.author)
            .bind(input.published_date)
            .bind(&input.category)
            .bind(input.is_available.unwrap_or(true))
            .fetch_one(&self.pool)
            .await?;
        Ok(book)
    }

    async fn replace_book(&self, id: i64, input: BookInput) -> AppResult<Option<Book>> {
        rules::check_book(&input, rules::today())?;
        let sql = format!(
            "UPDATE {} SET title = $2, author = $3, published_date = $4, category = $5, \
             is_available = COALESCE($6, is_available) WHERE id = $1 RETURNING {}",
            self.table("books"),
            BOOK_COLUMNS
        );
        let book = sqlx::query_as::<_, Book>(&sql)
            .bind(id)
            .bind(&input.title)
            .bind(&input.author)
            .bind(input.published_date)
            .bind(&input.category)
            .bind(input.is_available)
            .fetch_optional(&self.pool)
            .await?;
        Ok(book)
    }

    async fn delete_book(&self, id: i64) -> AppResult<bool> {
        self.delete_by_id("books", id).await
    }

    async fn count_members(&self) -> AppResult<u64> {
        self.count("members").await
    }

    async fn list_members(&self, offset: u64, limit: u64) -> AppResult<Vec<Member>> {
        let sql = format!(
            "SELECT {} FROM {} ORDER BY id LIMIT $1 OFFSET $2",
            MEMBER_COLUMNS,
            self.table("members")
        );
        tracing::debug!(sql = %sql, offset, limit, "query");
        let rows = sqlx::query_as::<_, Member>(&sql)
            .bind(limit as i64)
            .bind(offset as i64)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn get_member(&self, id: i64) -> AppResult<Option<Member>> {
        let sql = format!("SELECT {} FROM {} WHERE id = $1", MEMBER_COLUMNS, self.table("members"));
        Ok(sqlx::query_as::<_, Member>(&sql).bind(id).fetch_optional(&self.pool).await?)
    }

    async fn create_member(&self, input: MemberInput) -> AppResult<Member> {
        let input = rules::normalize_member(input)?;
        let sql = format!(
            "INSERT INTO {} (name, email, joined_date) VALUES ($1, $2, $3) RETURNING {}",
            self.table("members"),
            MEMBER_COLUMNS
        );
        sqlx::query_as::<_, Member>(&sql)
            .bind(&input.name)
            .bind(&input.email)
            .bind(rules::today())
            .fetch_one(&self.pool)
            .await
            .map_err(map_member_write)
    }

    async fn replace_member(&self, id: i64, input: MemberInput) -> AppResult<Option<Member>> {
        let input = rules::normalize_member(input)?;
        let sql = format!(
            "UPDATE {} SET name = $2, email = $3 WHERE id = $1 RETURNING {}",
            self.table("members"),
            MEMBER_COLUMNS
        );
        sqlx::query_as::<_, Member>(&sql)
            .bind(id)
            .bind(&input.name)
            .bind(&input.email)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_member_write)
    }

    async fn delete_member(&self, id: i64) -> AppResult<bool> {
        self.delete_by_id("members", id).await
    }

    async fn list_borrowings(&self) -> AppResult<Vec<BorrowingRecord>> {
        let sql = format!("SELECT {} FROM {} ORDER BY id", BORROWING_COLUMNS, self.table("borrowing_records"));
        Ok(sqlx::query_as::<_, BorrowingRecord>(&sql).fetch_all(&self.pool).await?)
    }

    async fn get_borrowing(&self, id: i64) -> AppResult<Option<BorrowingRecord>> {
        let sql = format!(
            "SELECT {} FROM {} WHERE id = $1",
            BORROWING_COLUMNS,
            self.table("borrowing_records")
        );
        Ok(sqlx::query_as::<_, BorrowingRecord>(&sql).bind(id).fetch_optional(&self.pool).await?)
    }

    async fn create_borrowing(&self, input: BorrowingInput) -> AppResult<BorrowingRecord> {
        let borrowed = rules::today();
        rules::check_borrowing(&input, borrowed)?;
        let mut tx = self.pool.begin().await?;

        let member_sql = format!("SELECT EXISTS(SELECT 1 FROM {} WHERE id = $1)", self.table("members"));
        let member_exists: bool = sqlx::query_scalar(&member_sql)
            .bind(input.member_id)
            .fetch_one(&mut *tx)
            .await?;
        if !member_exists {
            return Err(missing_reference("member", input.member_id));
        }

        // Row lock on the book serializes concurrent loans of the same copy.
        let lock_sql = format!("SELECT {} FROM {} WHERE id = $1 FOR UPDATE", BOOK_COLUMNS, self.table("books"));
        let book = sqlx::query_as::<_, Book>(&lock_sql)
            .bind(input.book_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| missing_reference("book", input.book_id))?;

        let transition = lifecycle::on_create(&book)?;
        sqlx::query(&format!("UPDATE {} SET is_available = $2 WHERE id = $1", self.table("books")))
            .bind(book.id)
            .bind(transition.availability())
            .execute(&mut *tx)
            .await?;

        let insert_sql = format!(
            "INSERT INTO {} (book_id, member_id, borrowed_date, returned_date) VALUES ($1, $2, $3, $4) RETURNING {}",
            self.table("borrowing_records"),
            BORROWING_COLUMNS
        );
        let record = sqlx::query_as::<_, BorrowingRecord>(&insert_sql)
            .bind(input.book_id)
            .bind(input.member_id)
            .bind(borrowed)
            .bind(input.returned_date)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| {
                if e.as_database_error().map(|d| d.is_foreign_key_violation()).unwrap_or(false) {
                    missing_reference("member", input.member_id)
                } else {
                    AppError::Db(e)
                }
            })?;
        tx.commit().await?;
        tracing::debug!(record = %record, "book lent");
        Ok(record)
    }

    async fn replace_borrowing(&self, id: i64, input: BorrowingInput) -> AppResult<Option<BorrowingRecord>> {
        let mut tx = self.pool.begin().await?;
        let lock_sql = format!(
            "SELECT {} FROM {} WHERE id = $1 FOR UPDATE",
            BORROWING_COLUMNS,
            self.table("borrowing_records")
        );
        let Some(current) = sqlx::query_as::<_, BorrowingRecord>(&lock_sql)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
        else {
            return Ok(None);
        };
        check_references_unchanged(&current, &input)?;
        rules::check_borrowing(&input, current.borrowed_date)?;

        if let Some(transition) = lifecycle::on_update(current.returned_date, input.returned_date)? {
            sqlx::query(&format!("UPDATE {} SET is_available = $2 WHERE id = $1", self.table("books")))
                .bind(current.book_id)
                .bind(transition.availability())
                .execute(&mut *tx)
                .await?;
        }

        let update_sql = format!(
            "UPDATE {} SET returned_date = $2 WHERE id = $1 RETURNING {}",
            self.table("borrowing_records"),
            BORROWING_COLUMNS
        );
        let record = sqlx::query_as::<_, BorrowingRecord>(&update_sql)
            .bind(id)
            .bind(input.returned_date)
            .fetch_one(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(Some(record))
    }

    async fn delete_borrowing(&self, id: i64) -> AppResult<bool> {
        self.delete_by_id("borrowing_records", id).await
    }
}

/// Ensure the database in `database_url` exists; create it if not. Connects to the
/// default `postgres` database to run CREATE DATABASE. Call before creating the main pool.
pub async fn ensure_database_exists(database_url: &str) -> AppResult<()> {
    let (admin_url, db_name) = parse_db_name_from_url(database_url)?;
    if db_name.is_empty() || db_name == "postgres" {
        return Ok(());
    }
    let opts = sqlx::postgres::PgConnectOptions::from_str(&admin_url)
        .map_err(|e| AppError::Internal(format!("invalid DATABASE_URL: {}", e)))?;
    let mut conn: sqlx::PgConnection = opts.connect().await?;
    let exists: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
        .bind(&db_name)
        .fetch_one(&mut conn)
        .await?;
    if !exists.0 {
        tracing::info!(database = %db_name, "creating database");
        sqlx::query(&format!("CREATE DATABASE {}", quote_ident(&db_name)))
            .execute(&mut conn)
            .await?;
    }
    Ok(())
}

fn parse_db_name_from_url(url: &str) -> AppResult<(String, String)> {
    let path_start = url
        .rfind('/')
        .ok_or_else(|| AppError::Internal("DATABASE_URL: no path".into()))?
        + 1;
    let path_and_query = url.get(path_start..).unwrap_or("");
    let mut parts = path_and_query.splitn(2, '?');
    let db_name = parts.next().unwrap_or("").trim();
    let query = parts.next().map(|q| format!("?{}", q)).unwrap_or_default();
    let base = url.get(..path_start).unwrap_or(url);
    let admin_url = format!("{}postgres{}", base, query);
    Ok((admin_url, db_name.to_string()))
}
