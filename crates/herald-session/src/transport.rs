//! Transport seam between the session manager and the messaging platform.

use async_trait::async_trait;
use herald_core::SessionError;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::TransportEvent;

/// A chat known to the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chat {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub is_group: bool,
}

/// Payload handed to a transport for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutgoingMessage {
    Text {
        text: String,
    },
    Media {
        mime_type: String,
        data: Vec<u8>,
        caption: String,
    },
}

/// Connection to the messaging platform.
///
/// `connect` starts one connection attempt and returns the attempt's event
/// stream. The stream ending means the attempt is over.
#[async_trait]
pub trait SessionTransport: Send + Sync + 'static {
    async fn connect(&self) -> Result<mpsc::Receiver<TransportEvent>, SessionError>;

    async fn chats(&self) -> Result<Vec<Chat>, SessionError>;

    async fn send(&self, chat_id: &str, message: OutgoingMessage) -> Result<(), SessionError>;

    async fn disconnect(&self) -> Result<(), SessionError>;
}
