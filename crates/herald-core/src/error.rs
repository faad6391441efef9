//! Error types shared across collaborator boundaries.

use thiserror::Error;

/// Errors raised by a content store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The request never produced a response (connect, timeout, TLS).
    #[error("store request failed: {0}")]
    Request(String),

    /// The store answered with a non-success status.
    #[error("store returned {status}: {message}")]
    Api { status: u16, message: String },

    /// The referenced item does not exist.
    #[error("item not found: {0}")]
    NotFound(String),

    /// The response body could not be understood.
    #[error("invalid store response: {0}")]
    InvalidResponse(String),
}

/// Errors raised by a captioning service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptionError {
    /// The request never produced a response.
    #[error("caption request failed: {0}")]
    Request(String),

    /// The service answered with a non-success status.
    #[error("captioner returned {status}: {message}")]
    Api { status: u16, message: String },

    /// The service answered but produced no text.
    #[error("captioner returned no text")]
    EmptyResponse,
}

/// Errors raised at the session/publisher boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// The session has not reached the ready state.
    #[error("session not ready")]
    NotReady,

    /// No chat matched the requested destination.
    #[error("destination not found: {0}")]
    DestinationNotFound(String),

    /// The transport to the messaging platform failed.
    #[error("session transport error: {0}")]
    Transport(String),

    /// The platform rejected or failed the send.
    #[error("send failed: {0}")]
    Send(String),
}
