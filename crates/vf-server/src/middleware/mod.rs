//! HTTP middleware: request ID and session authentication.

pub mod auth;
pub mod request_id;
