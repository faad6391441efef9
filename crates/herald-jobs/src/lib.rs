//! Job execution for Herald.
//!
//! [`JobRunner`] runs the two job kinds against the collaborator traits in
//! `herald-core`, allowing at most one active run per kind.

mod config;
mod error;
mod fallback;
mod runner;

pub use config::JobConfig;
pub use error::JobRejected;
pub use fallback::{FALLBACK_CAPTION, FALLBACK_QUOTES, fallback_greeting};
pub use runner::JobRunner;
