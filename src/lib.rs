//! Library records: REST backend for books, members and borrowing records.

pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod lifecycle;
pub mod model;
pub mod response;
pub mod routes;
pub mod rules;
pub mod service;
pub mod state;
pub mod store;
pub mod telemetry;

pub use config::{AppConfig, ConfigError, DatabaseConfig, PagingConfig};
pub use error::{AppError, AppResult, FieldErrors};
pub use model::{Book, BookInput, BorrowingInput, BorrowingRecord, Member, MemberInput};
pub use routes::app;
pub use state::AppState;
pub use store::{LibraryStore, MemoryStore, PgStore};
pub use telemetry::{Telemetry, TelemetryGuard};
