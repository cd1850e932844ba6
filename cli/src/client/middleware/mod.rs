//! HTTP client middleware.

pub mod auth;
pub mod trace;

pub use auth::AuthMiddleware;
pub use trace::TraceMiddleware;
