//! Netatmo Fetcher Library
//!
//! A Rust library for bulk downloading historical measurements from public
//! Netatmo weather stations. Responses are cached verbatim on disk so repeated
//! runs never hit the API twice for the same query, and live requests are
//! rate limited.

pub mod app;
pub mod auth;
pub mod cli;
pub mod config;
pub mod constants;
pub mod errors;

// Re-export commonly used types for convenience
pub use errors::{AppError, Result};
