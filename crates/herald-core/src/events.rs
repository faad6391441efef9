//! Fan-out of lifecycle and job events to observers.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::trace;

/// Capacity of the event channel. Slow observers lag and skip, they never block senders.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// An event as seen by the dashboard: a name plus optional payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardEvent {
    pub event: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl DashboardEvent {
    pub fn new(event: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            data: None,
        }
    }

    pub fn with_data(event: impl Into<String>, data: impl Into<Value>) -> Self {
        Self {
            event: event.into(),
            data: Some(data.into()),
        }
    }

    /// A human-readable log line.
    pub fn log(message: impl Into<String>) -> Self {
        Self::with_data("log", Value::String(message.into()))
    }
}

/// Observer list for [`DashboardEvent`]s.
///
/// Cloning shares the underlying channel. Publishing with nobody subscribed is a no-op.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<DashboardEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn publish(&self, event: DashboardEvent) {
        if self.tx.send(event).is_err() {
            trace!("no observers for dashboard event");
        }
    }

    pub fn emit(&self, event: impl Into<String>) {
        self.publish(DashboardEvent::new(event));
    }

    pub fn log(&self, message: impl Into<String>) {
        self.publish(DashboardEvent::log(message));
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DashboardEvent> {
        self.tx.subscribe()
    }

    pub fn observer_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_without_observers_is_noop() {
        let bus = EventBus::new();
        assert_eq!(bus.observer_count(), 0);
        bus.log("nobody is listening");
        bus.emit("ready");
    }

    #[tokio::test]
    async fn test_all_observers_receive() {
        let bus = EventBus::new();
        let mut a = bus.subscribe();
        let mut b = bus.clone().subscribe();

        bus.log("hello");

        assert_eq!(a.recv().await.unwrap(), DashboardEvent::log("hello"));
        assert_eq!(b.recv().await.unwrap(), DashboardEvent::log("hello"));
    }

    #[test]
    fn test_event_without_data_omits_field() {
        let json = serde_json::to_string(&DashboardEvent::new("ready")).unwrap();
        assert_eq!(json, r#"{"event":"ready"}"#);
    }
}
