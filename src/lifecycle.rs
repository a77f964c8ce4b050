//! Book availability transitions driven by borrowing-record writes.
//!
//! A book is either available or on loan; the state lives in `Book::is_available`.
//! Creating a borrowing record lends the book, and the first returned date on a
//! record returns it. Deleting a record or changing an existing returned date leaves
//! the book as it is. A returned date cannot be cleared once set, so a record returns
//! its book at most once.
//!
//! Stores call these functions while holding the lock (or row lock) on the book, so
//! the check and the flag update happen atomically.

use crate::error::{AppError, NON_FIELD_ERRORS};
use crate::model::Book;
use crate::rules::{BOOK_UNAVAILABLE, RETURN_CLEARED};
use chrono::NaiveDate;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    Lend,
    Return,
}

impl Transition {
    /// Availability flag the book holds after the transition.
    pub fn availability(self) -> bool {
        match self {
            Transition::Lend => false,
            Transition::Return => true,
        }
    }
}

/// Decide whether a new borrowing record may be created for `book`.
pub fn on_create(book: &Book) -> Result<Transition, AppError> {
    if !book.is_available {
        return Err(AppError::conflict(NON_FIELD_ERRORS, BOOK_UNAVAILABLE));
    }
    Ok(Transition::Lend)
}

/// Transition implied by replacing a record's returned date. Clearing a returned date
/// is rejected.
pub fn on_update(previous: Option<NaiveDate>, next: Option<NaiveDate>) -> Result<Option<Transition>, AppError> {
    match (previous, next) {
        (None, Some(_)) => Ok(Some(Transition::Return)),
        (Some(_), None) => Err(AppError::validation("returned_date", RETURN_CLEARED)),
        _ => Ok(None),
    }
}
