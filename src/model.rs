//! Stored entities and the validated inputs that create or replace them.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub author: String,
    pub published_date: NaiveDate,
    pub category: String,
    pub is_available: bool,
    pub created_at: DateTime<Utc>,
}

impl fmt::Display for Book {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.title)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Member {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub joined_date: NaiveDate,
}

impl fmt::Display for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct BorrowingRecord {
    pub id: i64,
    #[serde(rename = "book")]
    pub book_id: i64,
    #[serde(rename = "member")]
    pub member_id: i64,
    pub borrowed_date: NaiveDate,
    pub returned_date: Option<NaiveDate>,
}

impl fmt::Display for BorrowingRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "book {} borrowed by member {}", self.book_id, self.member_id)
    }
}

/// Writable book fields. `is_available` left unset keeps the stored value on replace
/// and defaults to true on create.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BookInput {
    pub title: String,
    pub author: String,
    pub published_date: NaiveDate,
    pub category: String,
    pub is_available: Option<bool>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemberInput {
    pub name: String,
    pub email: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BorrowingInput {
    pub book_id: i64,
    pub member_id: i64,
    pub returned_date: Option<NaiveDate>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn borrowing_record_uses_reference_field_names() {
        let record = BorrowingRecord {
            id: 3,
            book_id: 1,
            member_id: 2,
            borrowed_date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            returned_date: None,
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "id": 3,
                "book": 1,
                "member": 2,
                "borrowed_date": "2024-05-01",
                "returned_date": null
            })
        );
        assert_eq!(record.to_string(), "book 1 borrowed by member 2");
    }
}
