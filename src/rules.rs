//! Domain rules shared by request validation and the store commit path.
//!
//! Each rule is defined once here. Request validation calls them to build field-keyed
//! errors; store implementations call them again before committing a write, so both
//! layers reach the same decision for the same input.

use crate::error::{AppError, FieldErrors, NON_FIELD_ERRORS};
use crate::model::{BookInput, BorrowingInput, MemberInput};
use chrono::{NaiveDate, Utc};
use regex::Regex;
use std::sync::OnceLock;

pub const FUTURE_PUBLISHED_DATE: &str = "Published date cannot be in the future.";
pub const RETURN_BEFORE_BORROW: &str = "Returned date cannot be before borrowed date.";
pub const INVALID_EMAIL: &str = "Enter a valid email address.";
pub const DUPLICATE_EMAIL: &str = "member with this email already exists.";
pub const BOOK_UNAVAILABLE: &str = "This book is currently unavailable.";
pub const RETURN_CLEARED: &str = "Returned date cannot be cleared once set.";

pub const TITLE_MAX: usize = 255;
pub const AUTHOR_MAX: usize = 255;
pub const CATEGORY_MAX: usize = 100;
pub const NAME_MAX: usize = 255;
pub const EMAIL_MAX: usize = 254;

/// A rule failure tied to the field it concerns.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Violation {
    pub field: &'static str,
    pub message: &'static str,
}

impl Violation {
    pub fn record(self, errors: &mut FieldErrors) {
        errors.add(self.field, self.message);
    }
}

impl From<Violation> for AppError {
    fn from(v: Violation) -> Self {
        AppError::validation(v.field, v.message)
    }
}

/// Current calendar date (UTC) used for date rules and system-assigned dates.
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

pub fn published_date(date: NaiveDate, today: NaiveDate) -> Result<(), Violation> {
    if date > today {
        return Err(Violation {
            field: "published_date",
            message: FUTURE_PUBLISHED_DATE,
        });
    }
    Ok(())
}

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s.]+$").expect("email pattern compiles"))
}

/// Trimmed, lowercased email, or a violation when it does not look like an address.
/// Length is counted in characters, as for every other text field.
pub fn normalize_email(raw: &str) -> Result<String, Violation> {
    let email = raw.trim().to_lowercase();
    if email.chars().count() > EMAIL_MAX || !email_pattern().is_match(&email) {
        return Err(Violation {
            field: "email",
            message: INVALID_EMAIL,
        });
    }
    Ok(email)
}

/// Returned date, when present, must not precede the borrowed date.
pub fn return_order(borrowed: NaiveDate, returned: Option<NaiveDate>) -> Result<(), Violation> {
    match returned {
        Some(r) if r < borrowed => Err(Violation {
            field: NON_FIELD_ERRORS,
            message: RETURN_BEFORE_BORROW,
        }),
        _ => Ok(()),
    }
}

/// Commit-path check for a book write.
pub fn check_book(input: &BookInput, today: NaiveDate) -> Result<(), Violation> {
    published_date(input.published_date, today)
}

/// Commit-path normalization for a member write.
pub fn normalize_member(mut input: MemberInput) -> Result<MemberInput, Violation> {
    input.email = normalize_email(&input.email)?;
    Ok(input)
}

/// Commit-path check for a borrowing write against the record's borrowed date.
pub fn check_borrowing(input: &BorrowingInput, borrowed: NaiveDate) -> Result<(), Violation> {
    return_order(borrowed, input.returned_date)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn published_date_rejects_future() {
        let today = date(2024, 6, 10);
        assert!(published_date(today, today).is_ok());
        assert!(published_date(date(1999, 1, 1), today).is_ok());
        let err = published_date(date(2024, 6, 11), today).unwrap_err();
        assert_eq!(err.field, "published_date");
        assert_eq!(err.message, FUTURE_PUBLISHED_DATE);
    }

    #[test]
    fn email_is_lowercased_and_trimmed() {
        assert_eq!(normalize_email("  Ada.Lovelace@Example.COM ").unwrap(), "ada.lovelace@example.com");
    }

    #[test]
    fn email_shape_is_checked() {
        for bad in ["", "plain", "@example.com", "a@b", "a b@example.com", "a@example."] {
            assert!(normalize_email(bad).is_err(), "{bad:?} accepted");
        }
        let long = format!("{}@example.com", "a".repeat(250));
        assert!(normalize_email(&long).is_err());
    }

    #[test]
    fn email_length_counts_characters() {
        // 252 characters, well over EMAIL_MAX bytes.
        let accented = format!("{}@example.com", "é".repeat(240));
        assert!(accented.len() > EMAIL_MAX);
        assert_eq!(normalize_email(&accented).unwrap(), accented);
        let over = format!("{}@example.com", "é".repeat(243));
        assert!(normalize_email(&over).is_err());
    }

    #[test]
    fn return_order_allows_same_day_and_absent() {
        let borrowed = date(2024, 3, 1);
        assert!(return_order(borrowed, None).is_ok());
        assert!(return_order(borrowed, Some(borrowed)).is_ok());
        assert!(return_order(borrowed, Some(date(2024, 3, 2))).is_ok());
        let err = return_order(borrowed, Some(date(2024, 2, 29))).unwrap_err();
        assert_eq!(err.field, NON_FIELD_ERRORS);
    }

    #[test]
    fn violation_becomes_validation_error() {
        let err: AppError = Violation {
            field: "email",
            message: INVALID_EMAIL,
        }
        .into();
        match err {
            AppError::Validation(errors) => assert_eq!(errors.get("email"), Some(&[INVALID_EMAIL.to_string()][..])),
            other => panic!("unexpected {other:?}"),
        }
    }
}
