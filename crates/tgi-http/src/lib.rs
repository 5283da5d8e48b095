//! HTTP façade (axum).
//!
//! This crate exposes the `tgi-core` session manager and account registry as
//! a small JSON API. Handlers stay thin: parse the request, call the core,
//! record an audit event, map the outcome to a response.

pub mod error;
pub mod handlers;
pub mod router;

pub use error::ApiError;
pub use router::{build_router, serve, AppState};

#[cfg(test)]
pub(crate) mod test_support;
