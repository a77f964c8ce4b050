//! Router assembly: common routes at the root, resource routes under `/api`, and the
//! request tracing, panic and body-size layers around all of them.

mod common;
mod library;

pub use common::common_routes;
pub use library::library_routes;

use crate::error::internal_error_body;
use crate::state::AppState;
use axum::{
    body::Body,
    http::{Request, Response, StatusCode},
    response::IntoResponse,
    Json, Router,
};
use std::any::Any;
use std::time::Duration;
use tower_http::{catch_panic::CatchPanicLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing::Span;

/// Request bodies above this size are rejected with 413 before any handler runs.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Full application router for the given state.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(common_routes(state.clone()))
        .nest("/api", library_routes(state))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<Body>| {
                    tracing::info_span!(
                        "request",
                        request_id = %uuid::Uuid::new_v4(),
                        method = %request.method(),
                        uri = %request.uri(),
                    )
                })
                .on_request(())
                .on_response(|response: &Response<Body>, latency: Duration, _span: &Span| {
                    let status = response.status();
                    if status.is_server_error() {
                        tracing::warn!(status = %status, latency_ms = latency.as_millis(), "request failed");
                    } else {
                        tracing::debug!(status = %status, latency_ms = latency.as_millis(), "request finished");
                    }
                }),
        )
}

fn panic_response(payload: Box<dyn Any + Send + 'static>) -> Response<Body> {
    let detail = if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else {
        "unknown panic payload"
    };
    tracing::error!(panic = %detail, "handler panicked");
    (StatusCode::INTERNAL_SERVER_ERROR, Json(internal_error_body())).into_response()
}
