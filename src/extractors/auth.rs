//! Bearer-token authentication for resource routes.

use crate::error::AppError;
use crate::state::AppState;
use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Request},
    http::{header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};

/// A caller whose `Authorization: Bearer <token>` matched a configured token.
#[derive(Clone, Debug)]
pub struct AuthenticatedCaller {
    /// Last characters of the token, for log correlation without leaking it.
    pub fingerprint: String,
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    Some(token.trim()).filter(|t| !t.is_empty())
}

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedCaller {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(AppError::Unauthorized)?;
        if !state.api_tokens.contains(token) {
            tracing::debug!(path = %parts.uri.path(), "rejected unknown bearer token");
            return Err(AppError::Unauthorized);
        }
        let tail: String = token.chars().rev().take(4).collect::<Vec<_>>().into_iter().rev().collect();
        Ok(AuthenticatedCaller {
            fingerprint: format!("...{}", tail),
        })
    }
}

/// Middleware for `route_layer`: rejects unauthenticated requests before any handler runs.
pub async fn require_caller(caller: AuthenticatedCaller, request: Request, next: Next) -> Response {
    tracing::trace!(caller = %caller.fingerprint, "authenticated");
    next.run(request).await
}
