//! Dashboard relay for Herald.
//!
//! This crate provides a small HTTP surface for an operator dashboard:
//! - Health and session status
//! - A live Server-Sent Events stream of lifecycle and job events
//! - Manual job triggers, refused while the session is not ready

mod error;
mod routes;
mod sse;

pub use error::WebError;
pub use routes::{AppState, create_router};
