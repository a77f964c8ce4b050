//! HTTP handlers, one module per resource.
//!
//! Every handler body runs through [`guarded`], which logs internal faults with the
//! operation and verb before they are turned into opaque 500 responses.

pub mod books;
pub mod borrowings;
pub mod members;

use crate::error::{AppError, AppResult};
use std::future::Future;

fn parse_id(id_str: &str) -> AppResult<i64> {
    id_str
        .parse::<i64>()
        .map_err(|_| AppError::BadRequest(format!("invalid id: {}", id_str)))
}

async fn guarded<T>(
    operation: &'static str,
    verb: &'static str,
    work: impl Future<Output = AppResult<T>>,
) -> AppResult<T> {
    work.await.inspect_err(|e| {
        if e.is_internal() {
            tracing::error!(operation, verb, error = %e, "{} {} error", operation, verb);
        }
    })
}
