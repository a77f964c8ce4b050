//! Resource routes for books, members and borrowing records. Every route requires an
//! authenticated caller.

use crate::extractors::require_caller;
use crate::handlers::{books, borrowings, members};
use crate::state::AppState;
use axum::{middleware, routing::get, Router};

pub fn library_routes(state: AppState) -> Router {
    Router::new()
        .route("/books/", get(books::list).post(books::create))
        .route(
            "/books/:id/",
            get(books::read).put(books::replace).delete(books::delete),
        )
        .route("/members/", get(members::list).post(members::create))
        .route(
            "/members/:id/",
            get(members::read).put(members::replace).delete(members::delete),
        )
        .route("/borrowings/", get(borrowings::list).post(borrowings::create))
        .route(
            "/borrowings/:id/",
            get(borrowings::read).put(borrowings::replace).delete(borrowings::delete),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_caller))
        .with_state(state)
}
