//! Request-side services shared by the handlers.

mod validation;
pub use validation::RequestValidator;
