//! Session state machine.
//!
//! The transport reports raw events in whatever order it likes. [`transition`]
//! turns each raw event into zero or more state changes so that observers only
//! ever see a monotonic walk through the lifecycle for one connection attempt.

use herald_core::SessionState;
use serde::Serialize;

/// Raw event reported by a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// A pairing code or QR payload the operator must present.
    PairingCode(String),
    /// Credentials were accepted.
    Authenticated,
    /// The session finished loading and can send.
    Ready,
    /// Pairing or authentication was rejected.
    AuthFailure(String),
    /// The connection dropped.
    Disconnected(String),
}

/// Lifecycle event emitted by the session manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum SessionEvent {
    PairingChallenge(String),
    Authenticated,
    Ready,
    Disconnected(String),
}

impl SessionEvent {
    /// The state this event leaves the session in.
    pub fn state(&self) -> SessionState {
        match self {
            SessionEvent::PairingChallenge(_) => SessionState::PairingRequested,
            SessionEvent::Authenticated => SessionState::Authenticated,
            SessionEvent::Ready => SessionState::Ready,
            SessionEvent::Disconnected(_) => SessionState::Disconnected,
        }
    }
}

/// Compute the lifecycle events a transport event produces from `current`.
///
/// - A pairing code is only meaningful before authentication; later ones are dropped.
/// - Duplicate `Authenticated`/`Ready` reports are dropped.
/// - `Ready` before `Authenticated` emits a synthesized `Authenticated` first.
/// - Failures and disconnects always end in `Disconnected`.
pub fn transition(current: SessionState, event: TransportEvent) -> Vec<SessionEvent> {
    use SessionState::*;

    match event {
        TransportEvent::PairingCode(payload) => match current {
            Disconnected | PairingRequested => vec![SessionEvent::PairingChallenge(payload)],
            Authenticated | Ready => Vec::new(),
        },
        TransportEvent::Authenticated => match current {
            Disconnected | PairingRequested => vec![SessionEvent::Authenticated],
            Authenticated | Ready => Vec::new(),
        },
        TransportEvent::Ready => match current {
            Disconnected | PairingRequested => {
                vec![SessionEvent::Authenticated, SessionEvent::Ready]
            }
            Authenticated => vec![SessionEvent::Ready],
            Ready => Vec::new(),
        },
        TransportEvent::AuthFailure(message) => {
            vec![SessionEvent::Disconnected(format!(
                "authentication failed: {}",
                message
            ))]
        }
        TransportEvent::Disconnected(reason) => vec![SessionEvent::Disconnected(reason)],
    }
}
