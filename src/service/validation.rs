//! Request body validation: JSON object to typed input, collecting every field error.

use crate::error::{AppError, AppResult, FieldErrors};
use crate::model::{BookInput, BorrowingInput, MemberInput};
use crate::rules;
use chrono::NaiveDate;
use serde_json::{Map, Value};

const REQUIRED: &str = "This field is required.";
const NOT_NULL: &str = "This field may not be null.";
const NOT_BLANK: &str = "This field may not be blank.";
const NOT_STRING: &str = "Not a valid string.";
const NOT_BOOLEAN: &str = "Must be a valid boolean.";
const BAD_DATE: &str = "Date has wrong format. Use one of these formats instead: YYYY-MM-DD.";

pub struct RequestValidator;

impl RequestValidator {
    pub fn book(body: &Value, today: NaiveDate) -> AppResult<BookInput> {
        let mut f = Fields::new(body)?;
        let title = f.text("title", rules::TITLE_MAX);
        let author = f.text("author", rules::AUTHOR_MAX);
        let published_date = f.date("published_date");
        let category = f.text("category", rules::CATEGORY_MAX);
        let is_available = f.optional_bool("is_available");
        if let Some(date) = published_date {
            if let Err(v) = rules::published_date(date, today) {
                v.record(&mut f.errors);
            }
        }
        match (title, author, published_date, category) {
            (Some(title), Some(author), Some(published_date), Some(category)) if f.errors.is_empty() => Ok(BookInput {
                title,
                author,
                published_date,
                category,
                is_available,
            }),
            _ => Err(AppError::Validation(f.errors)),
        }
    }

    pub fn member(body: &Value) -> AppResult<MemberInput> {
        let mut f = Fields::new(body)?;
        let name = f.text("name", rules::NAME_MAX);
        let email = f.text("email", rules::EMAIL_MAX).and_then(|raw| match rules::normalize_email(&raw) {
            Ok(email) => Some(email),
            Err(v) => {
                v.record(&mut f.errors);
                None
            }
        });
        match (name, email) {
            (Some(name), Some(email)) if f.errors.is_empty() => Ok(MemberInput { name, email }),
            _ => Err(AppError::Validation(f.errors)),
        }
    }

    pub fn borrowing(body: &Value) -> AppResult<BorrowingInput> {
        let mut f = Fields::new(body)?;
        let book_id = f.reference("book");
        let member_id = f.reference("member");
        let returned_date = f.optional_date("returned_date");
        match (book_id, member_id) {
            (Some(book_id), Some(member_id)) if f.errors.is_empty() => Ok(BorrowingInput {
                book_id,
                member_id,
                returned_date,
            }),
            _ => Err(AppError::Validation(f.errors)),
        }
    }

    /// Cross-field date check for a borrowing write, against the date the loan started
    /// (today for a new record, the stored date for a replace).
    pub fn borrowing_dates(input: &BorrowingInput, borrowed: NaiveDate) -> AppResult<()> {
        rules::check_borrowing(input, borrowed)?;
        Ok(())
    }
}

/// Field reader over a JSON object that records errors instead of failing fast.
struct Fields<'a> {
    body: &'a Map<String, Value>,
    errors: FieldErrors,
}

impl<'a> Fields<'a> {
    fn new(body: &'a Value) -> AppResult<Self> {
        match body {
            Value::Object(map) => Ok(Fields {
                body: map,
                errors: FieldErrors::new(),
            }),
            _ => Err(AppError::BadRequest("body must be a JSON object".into())),
        }
    }

    /// Present and not null; records required / null errors otherwise.
    fn required(&mut self, name: &str) -> Option<&'a Value> {
        let body = self.body;
        match body.get(name) {
            None => {
                self.errors.add(name, REQUIRED);
                None
            }
            Some(Value::Null) => {
                self.errors.add(name, NOT_NULL);
                None
            }
            Some(v) => Some(v),
        }
    }

    fn text(&mut self, name: &str, max_len: usize) -> Option<String> {
        let v = self.required(name)?;
        let Some(s) = v.as_str() else {
            self.errors.add(name, NOT_STRING);
            return None;
        };
        let s = s.trim();
        if s.is_empty() {
            self.errors.add(name, NOT_BLANK);
            return None;
        }
        if s.chars().count() > max_len {
            self.errors
                .add(name, format!("Ensure this field has no more than {} characters.", max_len));
            return None;
        }
        Some(s.to_string())
    }

    fn parse_date(&mut self, name: &str, v: &Value) -> Option<NaiveDate> {
        match v.as_str().and_then(|s| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()) {
            Some(d) => Some(d),
            None => {
                self.errors.add(name, BAD_DATE);
                None
            }
        }
    }

    fn date(&mut self, name: &str) -> Option<NaiveDate> {
        let v = self.required(name)?;
        self.parse_date(name, v)
    }

    /// Absent or null is `None`; a malformed value records an error.
    fn optional_date(&mut self, name: &str) -> Option<NaiveDate> {
        let body = self.body;
        match body.get(name) {
            None | Some(Value::Null) => None,
            Some(v) => self.parse_date(name, v),
        }
    }

    fn optional_bool(&mut self, name: &str) -> Option<bool> {
        let body = self.body;
        match body.get(name) {
            None | Some(Value::Null) => None,
            Some(Value::Bool(b)) => Some(*b),
            Some(Value::String(s)) => match s.to_lowercase().as_str() {
                "true" | "1" => Some(true),
                "false" | "0" => Some(false),
                _ => {
                    self.errors.add(name, NOT_BOOLEAN);
                    None
                }
            },
            Some(Value::Number(n)) => match n.as_i64() {
                Some(1) => Some(true),
                Some(0) => Some(false),
                _ => {
                    self.errors.add(name, NOT_BOOLEAN);
                    None
                }
            },
            Some(_) => {
                self.errors.add(name, NOT_BOOLEAN);
                None
            }
        }
    }

    /// Primary key of a related row, as a JSON integer or numeric string.
    fn reference(&mut self, name: &str) -> Option<i64> {
        let v = self.required(name)?;
        let id = match v {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        };
        if id.is_none() {
            let received = match v {
                Value::String(_) => "str",
                Value::Bool(_) => "bool",
                Value::Array(_) => "list",
                Value::Object(_) => "dict",
                _ => "number",
            };
            self.errors
                .add(name, format!("Incorrect type. Expected pk value, received {}.", received));
        }
        id
    }
}
