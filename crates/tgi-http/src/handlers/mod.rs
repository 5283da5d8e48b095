//! Endpoint handlers.
//!
//! Each handler is a small adapter that:
//! - extracts and validates the request
//! - calls into the `tgi-core` session manager or account registry
//! - writes an audit event for security-relevant outcomes

pub mod accounts;
pub mod invite;
pub mod session;
pub mod status;
pub mod verification;
