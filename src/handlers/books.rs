//! Book handlers: paginated list, create, read, replace, delete.

use super::{guarded, parse_id};
use crate::error::AppError;
use crate::extractors::JsonBody;
use crate::response::{created, ok, Page, PageQuery, PageWindow};
use crate::rules;
use crate::service::RequestValidator;
use crate::state::AppState;
use axum::{
    extract::{OriginalUri, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};

const OPERATION: &str = "Book";

fn not_found(id: i64) -> AppError {
    AppError::NotFound(format!("Book {} not found", id))
}

pub async fn list(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, AppError> {
    guarded(OPERATION, "GET", async move {
        let count = state.store.count_books().await?;
        let window = PageWindow::resolve(&query, &state.paging, count)?;
        let books = state.store.list_books(window.offset(), window.size).await?;
        Ok::<_, AppError>(ok(Page::new(window, count, books, uri.path())))
    })
    .await
}

pub async fn create(
    State(state): State<AppState>,
    JsonBody(body): JsonBody,
) -> Result<impl IntoResponse, AppError> {
    guarded(OPERATION, "POST", async move {
        let input = RequestValidator::book(&body, rules::today())?;
        let book = state.store.create_book(input).await?;
        tracing::info!(id = book.id, title = %book, "book created");
        Ok::<_, AppError>(created(book))
    })
    .await
}

pub async fn read(
    State(state): State<AppState>,
    Path(id_str): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    guarded(OPERATION, "GET", async move {
        let id = parse_id(&id_str)?;
        let book = state.store.get_book(id).await?.ok_or_else(|| not_found(id))?;
        Ok::<_, AppError>(ok(book))
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
        state.store.get_book(id).await?.ok_or_else(|| not_found(id))?;
        let input = RequestValidator::book(&body, rules::today())?;
        let book = state
            .store
            .replace_book(id, input)
            .await?
            .ok_or_else(|| not_found(id))?;
        Ok::<_, AppError>(ok(book))
    })
    .await
}

pub async fn delete(
    State(state): State<AppState>,
    Path(id_str): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    guarded(OPERATION, "DELETE", async move {
        let id = parse_id(&id_str)?;
        if !state.store.delete_book(id).await? {
            return Err(not_found(id));
        }
        tracing::info!(id, "book deleted");
        Ok::<_, AppError>(StatusCode::NO_CONTENT)
    })
    .await
}
