//! Cross-cutting request concerns: caller identity and error responses.

pub mod auth;
pub mod error_handling;
