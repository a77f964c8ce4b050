//! In-process store: ordered maps behind one async lock.
//!
//! Used when no database is configured and by the test suites. Every write holds the
//! write lock for its whole duration, which makes the lend check-then-set atomic.

use super::{check_references_unchanged, missing_reference, LibraryStore};
use crate::error::{AppError, AppResult};
use crate::lifecycle;
use crate::model::{Book, BookInput, BorrowingInput, BorrowingRecord, Member, MemberInput};
use crate::rules::{self, DUPLICATE_EMAIL};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

#[derive(Default)]
struct Tables {
    books: BTreeMap<i64, Book>,
    members: BTreeMap<i64, Member>,
    borrowings: BTreeMap<i64, BorrowingRecord>,
    last_book_id: i64,
    last_member_id: i64,
    last_borrowing_id: i64,
}

impl Tables {
    fn email_taken(&self, email: &str, except: Option<i64>) -> bool {
        self.members
            .values()
            .any(|m| m.email == email && Some(m.id) != except)
    }
}

fn next_id(last: &mut i64) -> i64 {
    *last += 1;
    *last
}

fn page<T: Clone>(map: &BTreeMap<i64, T>, offset: u64, limit: u64) -> Vec<T> {
    map.values()
        .skip(offset as usize)
        .take(limit as usize)
        .cloned()
        .collect()
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LibraryStore for MemoryStore {
    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }

    async fn count_books(&self) -> AppResult<u64> {
        Ok(self.tables.read().await.books.len() as u64)
    }

    async fn list_books(&self, offset: u64, limit: u64) -> AppResult<Vec<Book>> {
        Ok(page(&self.tables.read().await.books, offset, limit))
    }

    async fn get_book(&self, id: i64) -> AppResult<Option<Book>> {
        Ok(self.tables.read().await.books.get(&id).cloned())
    }

    async fn create_book(&self, input: BookInput) -> AppResult<Book> {
        rules::check_book(&input, rules::today())?;
        let mut tables = self.tables.write().await;
        let book = Book {
            id: next_id(&mut tables.last_book_id),
            title: input.title,
            author: input.author,
            published_date: input.published_date,
            category: input.category,
            is_available: input.is_available.unwrap_or(true),
            created_at: Utc::now(),
        };
        tables.books.insert(book.id, book.clone());
        Ok(book)
    }

    async fn replace_book(&self, id: i64, input: BookInput) -> AppResult<Option<Book>> {
        rules::check_book(&input, rules::today())?;
        let mut tables = self.tables.write().await;
        let Some(book) = tables.books.get_mut(&id) else {
            return Ok(None);
        };
        book.title = input.title;
        book.author = input.author;
        book.published_date = input.published_date;
        book.category = input.category;
        if let Some(flag) = input.is_available {
            book.is_available = flag;
        }
        Ok(Some(book.clone()))
    }

    async fn delete_book(&self, id: i64) -> AppResult<bool> {
        let mut tables = self.tables.write().await;
        if tables.books.remove(&id).is_none() {
            return Ok(false);
        }
        tables.borrowings.retain(|_, r| r.book_id != id);
        Ok(true)
    }

    async fn count_members(&self) -> AppResult<u64> {
        Ok(self.tables.read().await.members.len() as u64)
    }

    async fn list_members(&self, offset: u64, limit: u64) -> AppResult<Vec<Member>> {
        Ok(page(&self.tables.read().await.members, offset, limit))
    }

    async fn get_member(&self, id: i64) -> AppResult<Option<Member>> {
        Ok(self.tables.read().await.members.get(&id).cloned())
    }

    async fn create_member(&self, input: MemberInput) -> AppResult<Member> {
        let input = rules::normalize_member(input)?;
        let mut tables = self.tables.write().await;
        if tables.email_taken(&input.email, None) {
            return Err(AppError::conflict("email", DUPLICATE_EMAIL));
        }
        let member = Member {
            id: next_id(&mut tables.last_member_id),
            name: input.name,
            email: input.email,
            joined_date: rules::today(),
        };
        tables.members.insert(member.id, member.clone());
        Ok(member)
    }

    async fn replace_member(&self, id: i64, input: MemberInput) -> AppResult<Option<Member>> {
        let input = rules::normalize_member(input)?;
        let mut tables = self.tables.write().await;
        if !tables.members.contains_key(&id) {
            return Ok(None);
        }
        if tables.email_taken(&input.email, Some(id)) {
            return Err(AppError::conflict("email", DUPLICATE_EMAIL));
        }
        let member = tables
            .members
            .get_mut(&id)
            .ok_or_else(|| AppError::Internal(format!("member {} vanished under write lock", id)))?;
        member.name = input.name;
        member.email = input.email;
        Ok(Some(member.clone()))
    }

    async fn delete_member(&self, id: i64) -> AppResult<bool> {
        let mut tables = self.tables.write().await;
        if tables.members.remove(&id).is_none() {
            return Ok(false);
        }
        tables.borrowings.retain(|_, r| r.member_id != id);
        Ok(true)
    }

    async fn list_borrowings(&self) -> AppResult<Vec<BorrowingRecord>> {
        Ok(self.tables.read().await.borrowings.values().cloned().collect())
    }

    async fn get_borrowing(&self, id: i64) -> AppResult<Option<BorrowingRecord>> {
        Ok(self.tables.read().await.borrowings.get(&id).cloned())
    }

    async fn create_borrowing(&self, input: BorrowingInput) -> AppResult<BorrowingRecord> {
        let borrowed = rules::today();
        rules::check_borrowing(&input, borrowed)?;
        let mut tables = self.tables.write().await;
        if !tables.members.contains_key(&input.member_id) {
            return Err(missing_reference("member", input.member_id));
        }
        let book = tables
            .books
            .get_mut(&input.book_id)
            .ok_or_else(|| missing_reference("book", input.book_id))?;
        let transition = lifecycle::on_create(book)?;
        book.is_available = transition.availability();
        let record = BorrowingRecord {
            id: next_id(&mut tables.last_borrowing_id),
            book_id: input.book_id,
            member_id: input.member_id,
            borrowed_date: borrowed,
            returned_date: input.returned_date,
        };
        tables.borrowings.insert(record.id, record.clone());
        tracing::debug!(record = %record, "book lent");
        Ok(record)
    }

    async fn replace_borrowing(&self, id: i64, input: BorrowingInput) -> AppResult<Option<BorrowingRecord>> {
        let mut tables = self.tables.write().await;
        let Some(current) = tables.borrowings.get(&id).cloned() else {
            return Ok(None);
        };
        check_references_unchanged(&current, &input)?;
        rules::check_borrowing(&input, current.borrowed_date)?;
        if let Some(transition) = lifecycle::on_update(current.returned_date, input.returned_date)? {
            if let Some(book) = tables.books.get_mut(&current.book_id) {
                book.is_available = transition.availability();
            }
        }
        let record = BorrowingRecord {
            returned_date: input.returned_date,
            ..current
        };
        tables.borrowings.insert(id, record.clone());
        Ok(Some(record))
    }

    async fn delete_borrowing(&self, id: i64) -> AppResult<bool> {
        Ok(self.tables.write().await.borrowings.remove(&id).is_some())
    }
}
