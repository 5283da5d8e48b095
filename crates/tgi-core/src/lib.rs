//! Core domain + application logic for the Telegram invite service.
//!
//! This crate is intentionally framework-agnostic. The HTTP façade and the
//! MTProto client live behind ports (traits) implemented in adapter crates.

pub mod code;
pub mod config;
pub mod domain;
pub mod errors;
pub mod lifecycle;
pub mod logging;
pub mod pending;
pub mod protocol;
pub mod registry;
pub mod security;
pub mod store;
pub mod utils;

pub use errors::{Error, Result};
