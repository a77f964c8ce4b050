//! Borrowing record handlers. Listing is unpaginated; create and replace drive the
//! book availability lifecycle through the store.

use super::{guarded, parse_id};
use crate::error::AppError;
use crate::extractors::JsonBody;
use crate::response::{created, ok};
use crate::rules;
use crate::service::RequestValidator;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

const OPERATION: &str = "BorrowingRecord";

fn not_found(id: i64) -> AppError {
    AppError::NotFound(format!("BorrowingRecord {} not found", id))
}

pub async fn list(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    guarded(OPERATION, "GET", async move {
        let records = state.store.list_borrowings().await?;
        Ok::<_, AppError>(ok(records))
    })
    .await
}

pub async fn create(
    State(state): State<AppState>,
    JsonBody(body): JsonBody,
) -> Result<impl IntoResponse, AppError> {
    guarded(OPERATION, "POST", async move {
        let input = RequestValidator::borrowing(&body)?;
        RequestValidator::borrowing_dates(&input, rules::today())?;
        let record = state.store.create_borrowing(input).await?;
        tracing::info!(id = record.id, record = %record, "book lent");
        Ok::<_, AppError>(created(record))
    })
    .await
}

pub async fn read(
    State(state): State<AppState>,
    Path(id_str): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    guarded(OPERATION, "GET", async move {
        let id = parse_id(&id_str)?;
        let record = state.store.get_borrowing(id).await?.ok_or_else(|| not_found(id))?;
        Ok::<_, AppError>(ok(record))
    })
    .await
}

pub async fn replace(
    State(state): State<AppState>,
    Path(id_str): Path<String>,
    JsonBody(body): JsonBody,
) -> Result<impl IntoResponse, AppError> {
    guarded(OPERATION, "PUT", async move {
        let id = parse_id(&id_str)?;
        let current = state.store.get_borrowing(id).await?.ok_or_else(|| not_found(id))?;
        let input = RequestValidator::borrowing(&body)?;
        RequestValidator::borrowing_dates(&input, current.borrowed_date)?;
        let record = state
            .store
            .replace_borrowing(id, input)
            .await?
            .ok_or_else(|| not_found(id))?;
        if current.returned_date.is_none() && record.returned_date.is_some() {
            tracing::info!(id, book = record.book_id, "book returned");
        }
        Ok::<_, AppError>(ok(record))
    })
    .await
}

pub async fn delete(
    State(state): State<AppState>,
    Path(id_str): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    guarded(OPERATION, "DELETE", async move {
        let id = parse_id(&id_str)?;
        if !state.store.delete_borrowing(id).await? {
            return Err(not_found(id));
        }
        Ok::<_, AppError>(StatusCode::NO_CONTENT)
    })
    .await
}
