//! Member handlers. Emails are normalized by the validator and again by the store.

use super::{guarded, parse_id};
use crate::error::AppError;
use crate::extractors::JsonBody;
use crate::response::{created, ok, Page, PageQuery, PageWindow};
use crate::service::RequestValidator;
use crate::state::AppState;
use axum::{
    extract::{OriginalUri, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};

const OPERATION: &str = "Member";

fn not_found(id: i64) -> AppError {
    AppError::NotFound(format!("Member {} not found", id))
}

pub async fn list(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, AppError> {
    guarded(OPERATION, "GET", async move {
        let count = state.store.count_members().await?;
        let window = PageWindow::resolve(&query, &state.paging, count)?;
        let members = state.store.list_members(window.offset(), window.size).await?;
        Ok::<_, AppError>(ok(Page::new(window, count, members, uri.path())))
    })
    .await
}

pub async fn create(
    State(state): State<AppState>,
    JsonBody(body): JsonBody,
) -> Result<impl IntoResponse, AppError> {
    guarded(OPERATION, "POST", async move {
        let input = RequestValidator::member(&body)?;
        let member = state.store.create_member(input).await?;
        tracing::info!(id = member.id, "member created");
        Ok::<_, AppError>(created(member))
    })
    .await
}

pub async fn read(
    State(state): State<AppState>,
    Path(id_str): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    guarded(OPERATION, "GET", async move {
        let id = parse_id(&id_str)?;
        let member = state.store.get_member(id).await?.ok_or_else(|| not_found(id))?;
        Ok::<_, AppError>(ok(member))
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
        state.store.get_member(id).await?.ok_or_else(|| not_found(id))?;
        let input = RequestValidator::member(&body)?;
        let member = state
            .store
            .replace_member(id, input)
            .await?
            .ok_or_else(|| not_found(id))?;
        Ok::<_, AppError>(ok(member))
    })
    .await
}

pub async fn delete(
    State(state): State<AppState>,
    Path(id_str): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    guarded(OPERATION, "DELETE", async move {
        let id = parse_id(&id_str)?;
        if !state.store.delete_member(id).await? {
            return Err(not_found(id));
        }
        tracing::info!(id, "member deleted");
        Ok::<_, AppError>(StatusCode::NO_CONTENT)
    })
    .await
}
