//! Messaging session lifecycle for Herald.
//!
//! This crate owns the single outbound session to the messaging platform:
//! - [`SessionManager`] drives the transport and is the only writer of [`SessionState`]
//! - [`SessionPublisher`] adapts the session into the [`herald_core::Publisher`] trait
//! - [`BridgeTransport`] talks to the WhatsApp bridge sidecar over WebSocket and REST
//!
//! [`SessionState`]: herald_core::SessionState

mod bridge;
mod manager;
mod publisher;
mod state;
mod transport;

pub use bridge::{BridgeError, BridgeTransport};
pub use manager::{ReconnectPolicy, SessionManager};
pub use publisher::{SessionPublisher, resolve_destination};
pub use state::{SessionEvent, TransportEvent, transition};
pub use transport::{Chat, OutgoingMessage, SessionTransport};
