//! Collaborator interfaces consumed by the job runner.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::{CaptionError, DayCategory, PendingItem, SessionError, StoreError};

/// Remote store holding the pending and done locations.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// List items directly inside `location` whose mime type starts with `mime_prefix`.
    async fn list(&self, location: &str, mime_prefix: &str)
    -> Result<Vec<PendingItem>, StoreError>;

    /// Download the raw bytes of an item.
    async fn fetch(&self, item_id: &str) -> Result<Vec<u8>, StoreError>;

    /// Reparent an item from one location to another.
    async fn move_to_location(&self, item_id: &str, from: &str, to: &str)
    -> Result<(), StoreError>;
}

/// Text generation service.
#[async_trait]
pub trait Captioner: Send + Sync {
    /// Describe an image for posting.
    async fn describe_image(&self, bytes: &[u8], mime_type: &str) -> Result<String, CaptionError>;

    /// Produce the greeting for `date`.
    async fn greeting(&self, date: NaiveDate, category: DayCategory)
    -> Result<String, CaptionError>;
}

/// Sends messages through the messaging session.
///
/// Implementations must refuse to send unless [`Publisher::is_ready`] holds and
/// must resolve `destination` on every call.
#[async_trait]
pub trait Publisher: Send + Sync {
    fn is_ready(&self) -> bool;

    async fn send_text(&self, destination: &str, text: &str) -> Result<(), SessionError>;

    async fn send_image(
        &self,
        destination: &str,
        bytes: &[u8],
        caption: &str,
        mime_type: &str,
    ) -> Result<(), SessionError>;
}
