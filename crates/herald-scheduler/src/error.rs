//! Error types for the scheduler.

use thiserror::Error;

/// Errors that can occur in scheduler operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulerError {
    /// A trigger time could not be parsed.
    #[error("invalid trigger time '{0}', expected HH:MM")]
    InvalidTime(String),

    /// A timezone name is not in the tz database.
    #[error("unknown timezone '{0}'")]
    UnknownTimezone(String),
}
