//! Error types for the Gemini client.

use herald_core::CaptionError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GeminiError {
    #[error("failed to build HTTP client: {0}")]
    Client(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Gemini API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The response had no candidate text, e.g. it was blocked.
    #[error("no text in response (finish reason: {0})")]
    Empty(String),
}

impl From<GeminiError> for CaptionError {
    fn from(e: GeminiError) -> Self {
        match e {
            GeminiError::Api { status, message } => CaptionError::Api { status, message },
            GeminiError::Empty(_) => CaptionError::EmptyResponse,
            other => CaptionError::Request(other.to_string()),
        }
    }
}
