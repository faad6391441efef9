//! Error types for the dashboard relay.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use herald_core::ParseJobKindError;
use herald_jobs::JobRejected;
use serde_json::json;
use thiserror::Error;

/// Errors that can occur in the dashboard relay.
#[derive(Debug, Error)]
pub enum WebError {
    /// Triggers are refused until the session is ready.
    #[error("session not ready")]
    NotReady,

    /// A run of that kind is already active.
    #[error(transparent)]
    Busy(#[from] JobRejected),

    /// The path named no known job.
    #[error(transparent)]
    UnknownJob(#[from] ParseJobKindError),
}

impl WebError {
    fn status(&self) -> StatusCode {
        match self {
            WebError::NotReady | WebError::Busy(_) => StatusCode::CONFLICT,
            WebError::UnknownJob(_) => StatusCode::NOT_FOUND,
        }
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
