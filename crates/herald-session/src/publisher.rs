//! Publisher backed by the session manager.

use std::sync::Arc;

use async_trait::async_trait;
use herald_core::{Publisher, SessionError};
use tracing::info;

use crate::{Chat, OutgoingMessage, SessionManager};

/// Find the chat a destination refers to.
///
/// An exact id match wins; otherwise the first group whose name contains
/// `name_or_id` case-insensitively.
pub fn resolve_destination<'a>(chats: &'a [Chat], name_or_id: &str) -> Option<&'a Chat> {
    if name_or_id.is_empty() {
        return None;
    }

    if let Some(chat) = chats.iter().find(|c| c.id == name_or_id) {
        return Some(chat);
    }

    let needle = name_or_id.to_lowercase();
    chats
        .iter()
        .find(|c| c.is_group && c.name.to_lowercase().contains(&needle))
}

/// Sends through the managed session, refusing whenever it is not ready.
#[derive(Clone)]
pub struct SessionPublisher {
    session: Arc<SessionManager>,
}

impl SessionPublisher {
    pub fn new(session: Arc<SessionManager>) -> Self {
        Self { session }
    }

    /// Groups currently visible to the session.
    pub async fn list_groups(&self) -> Result<Vec<Chat>, SessionError> {
        if !self.session.is_ready() {
            return Err(SessionError::NotReady);
        }
        let chats = self.session.transport().chats().await?;
        Ok(chats.into_iter().filter(|c| c.is_group).collect())
    }

    async fn resolve(&self, destination: &str) -> Result<Chat, SessionError> {
        if !self.session.is_ready() {
            return Err(SessionError::NotReady);
        }
        let chats = self.session.transport().chats().await?;
        resolve_destination(&chats, destination)
            .cloned()
            .ok_or_else(|| SessionError::DestinationNotFound(destination.to_string()))
    }

    async fn deliver(
        &self,
        destination: &str,
        message: OutgoingMessage,
    ) -> Result<(), SessionError> {
        let chat = self.resolve(destination).await?;
        // Readiness may have dropped during resolution.
        if !self.session.is_ready() {
            return Err(SessionError::NotReady);
        }
        self.session.transport().send(&chat.id, message).await?;
        info!(chat = %chat.name, chat_id = %chat.id, "message sent");
        Ok(())
    }
}

#[async_trait]
impl Publisher for SessionPublisher {
    fn is_ready(&self) -> bool {
        self.session.is_ready()
    }

    async fn send_text(&self, destination: &str, text: &str) -> Result<(), SessionError> {
        self.deliver(
            destination,
            OutgoingMessage::Text {
                text: text.to_string(),
            },
        )
        .await
    }

    async fn send_image(
        &self,
        destination: &str,
        bytes: &[u8],
        caption: &str,
        mime_type: &str,
    ) -> Result<(), SessionError> {
        self.deliver(
            destination,
            OutgoingMessage::Media {
                mime_type: mime_type.to_string(),
                data: bytes.to_vec(),
                caption: caption.to_string(),
            },
        )
        .await
    }
}
