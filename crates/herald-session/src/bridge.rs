//! Transport for the WhatsApp bridge sidecar.
//!
//! The browser session itself lives in the bridge process. Herald consumes:
//! - `GET  /events` (WebSocket): JSON lifecycle events
//! - `POST /session/start`, `POST /session/stop`: attempt control
//! - `GET  /chats`: known chats
//! - `POST /messages`: text or media sends

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use futures_util::{SinkExt, StreamExt};
use herald_core::SessionError;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, trace, warn};

use crate::{Chat, OutgoingMessage, SessionTransport, TransportEvent};

/// Buffer between the WebSocket reader and the session manager.
const EVENT_CHANNEL_SIZE: usize = 32;

/// Errors talking to the bridge.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("bridge returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("WebSocket error: {0}")]
    WebSocket(String),
}

impl From<BridgeError> for SessionError {
    fn from(e: BridgeError) -> Self {
        SessionError::Transport(e.to_string())
    }
}

/// Event frame sent by the bridge.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum BridgeEvent {
    Qr {
        qr: String,
    },
    Authenticated,
    Ready,
    AuthFailure {
        #[serde(default)]
        message: String,
    },
    Disconnected {
        #[serde(default)]
        reason: String,
    },
    #[serde(other)]
    Unknown,
}

/// Parse a text frame into a transport event. Unknown frames yield `None`.
fn parse_event(text: &str) -> Option<TransportEvent> {
    match serde_json::from_str::<BridgeEvent>(text) {
        Ok(BridgeEvent::Qr { qr }) => Some(TransportEvent::PairingCode(qr)),
        Ok(BridgeEvent::Authenticated) => Some(TransportEvent::Authenticated),
        Ok(BridgeEvent::Ready) => Some(TransportEvent::Ready),
        Ok(BridgeEvent::AuthFailure { message }) => Some(TransportEvent::AuthFailure(message)),
        Ok(BridgeEvent::Disconnected { reason }) => Some(TransportEvent::Disconnected(reason)),
        Ok(BridgeEvent::Unknown) => {
            trace!(frame = %text, "ignoring unknown bridge event");
            None
        }
        Err(e) => {
            warn!(error = %e, "malformed bridge event");
            None
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MediaBody<'a> {
    mime_type: &'a str,
    data: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SendBody<'a> {
    chat_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    media: Option<MediaBody<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    caption: Option<&'a str>,
}

/// Client for a bridge sidecar at `base_url`.
pub struct BridgeTransport {
    http: Client,
    base_url: String,
    reader: Mutex<Option<JoinHandle<()>>>,
}

impl BridgeTransport {
    pub fn new(base_url: impl Into<String>) -> Result<Self, BridgeError> {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(60))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            reader: Mutex::new(None),
        })
    }

    fn events_url(&self) -> String {
        let ws_base = if let Some(rest) = self.base_url.strip_prefix("https://") {
            format!("wss://{}", rest)
        } else if let Some(rest) = self.base_url.strip_prefix("http://") {
            format!("ws://{}", rest)
        } else {
            self.base_url.clone()
        };
        format!("{}/events", ws_base)
    }

    async fn post_empty(&self, path: &str) -> Result<(), BridgeError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self.http.post(&url).send().await?;
        check_status(response).await.map(|_| ())
    }

    async fn reader_task(
        ws: tokio_tungstenite::WebSocketStream<
            tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
        >,
        events_tx: mpsc::Sender<TransportEvent>,
    ) {
        let (mut write, mut read) = ws.split();

        let closing = loop {
            match read.next().await {
                Some(Ok(Message::Text(text))) => {
                    if let Some(event) = parse_event(&text) {
                        if events_tx.send(event).await.is_err() {
                            debug!("session manager dropped event stream, reader exiting");
                            return;
                        }
                    }
                }
                Some(Ok(Message::Ping(data))) => {
                    if let Err(e) = write.send(Message::Pong(data)).await {
                        break format!("pong failed: {}", e);
                    }
                }
                Some(Ok(Message::Close(_))) | None => {
                    break "bridge closed the event stream".to_string();
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => break format!("event stream error: {}", e),
            }
        };

        // Best-effort; the manager treats a closed channel as a disconnect too.
        let _ = events_tx.send(TransportEvent::Disconnected(closing)).await;
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, BridgeError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let message = response
        .text()
        .await
        .unwrap_or_else(|e| format!("failed to read response: {}", e));
    Err(BridgeError::Api { status, message })
}

#[async_trait]
impl SessionTransport for BridgeTransport {
    async fn connect(&self) -> Result<mpsc::Receiver<TransportEvent>, SessionError> {
        let url = self.events_url();
        info!(url = %url, "connecting to bridge event stream");

        let (ws, _) = connect_async(&url)
            .await
            .map_err(|e| BridgeError::WebSocket(format!("connection failed: {}", e)))?;

        // Subscribe before starting so the first pairing code is not missed.
        let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_SIZE);
        let handle = tokio::spawn(Self::reader_task(ws, events_tx));
        if let Some(previous) = self.reader.lock().await.replace(handle) {
            previous.abort();
        }

        self.post_empty("/session/start").await?;
        Ok(events_rx)
    }

    async fn chats(&self) -> Result<Vec<Chat>, SessionError> {
        let url = format!("{}/chats", self.base_url);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(BridgeError::from)?;
        let chats = check_status(response)
            .await?
            .json::<Vec<Chat>>()
            .await
            .map_err(BridgeError::from)?;
        debug!(count = chats.len(), "fetched chats from bridge");
        Ok(chats)
    }

    async fn send(&self, chat_id: &str, message: OutgoingMessage) -> Result<(), SessionError> {
        let url = format!("{}/messages", self.base_url);
        let body = match &message {
            OutgoingMessage::Text { text } => SendBody {
                chat_id,
                text: Some(text.as_str()),
                media: None,
                caption: None,
            },
            OutgoingMessage::Media {
                mime_type,
                data,
                caption,
            } => SendBody {
                chat_id,
                text: None,
                media: Some(MediaBody {
                    mime_type: mime_type.as_str(),
                    data: BASE64.encode(data),
                }),
                caption: Some(caption.as_str()),
            },
        };

        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| SessionError::Send(e.to_string()))?;

        check_status(response)
            .await
            .map(|_| ())
            .map_err(|e| SessionError::Send(e.to_string()))
    }

    async fn disconnect(&self) -> Result<(), SessionError> {
        let result = self.post_empty("/session/stop").await;
        if let Some(handle) = self.reader.lock().await.take() {
            handle.abort();
        }
        result.map_err(SessionError::from)
    }
}
