//! Error types for the Drive client.

use herald_core::StoreError;
use thiserror::Error;

/// Errors that can occur when talking to Drive.
#[derive(Debug, Error)]
pub enum DriveError {
    /// Client could not be built.
    #[error("failed to build HTTP client: {0}")]
    Client(String),

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// File or folder not found, or not visible to these credentials.
    #[error("not found: {0}")]
    NotFound(String),

    /// Drive returned an error status.
    #[error("Drive API error ({status}): {message}")]
    Api { status: u16, message: String },
}

impl From<DriveError> for StoreError {
    fn from(e: DriveError) -> Self {
        match e {
            DriveError::NotFound(id) => StoreError::NotFound(id),
            DriveError::Api { status, message } => StoreError::Api { status, message },
            DriveError::Http(e) if e.is_decode() => StoreError::InvalidResponse(e.to_string()),
            other => StoreError::Request(other.to_string()),
        }
    }
}
