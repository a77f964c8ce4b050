//! Request extractors: caller authentication and JSON bodies.

pub mod auth;
pub mod json;

pub use auth::{require_caller, AuthenticatedCaller};
pub use json::JsonBody;
