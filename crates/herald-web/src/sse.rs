//! Server-Sent Events for live updates.

use std::convert::Infallible;

use axum::response::sse::{Event, KeepAlive, Sse};
use herald_core::DashboardEvent;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tracing::trace;

/// Create an SSE stream that first replays `initial`, then follows `rx`.
///
/// Each SSE event is named after the dashboard event and carries its JSON
/// payload. Lagged observers skip missed events.
pub fn create_sse_stream(
    initial: Vec<DashboardEvent>,
    rx: tokio::sync::broadcast::Receiver<DashboardEvent>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>> {
    let live = BroadcastStream::new(rx).filter_map(
        |result: Result<DashboardEvent, BroadcastStreamRecvError>| match result {
            Ok(event) => Some(event),
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                trace!(skipped, "dashboard observer lagged");
                None
            }
        },
    );

    let stream = tokio_stream::iter(initial)
        .chain(live)
        .filter_map(|event| to_sse(&event).map(Ok));

    Sse::new(stream).keep_alive(KeepAlive::default())
}

fn to_sse(event: &DashboardEvent) -> Option<Event> {
    let data = event.data.clone().unwrap_or(serde_json::Value::Null);
    Event::default().event(&event.event).json_data(data).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_conversion() {
        assert!(to_sse(&DashboardEvent::log("hello")).is_some());
        assert!(to_sse(&DashboardEvent::new("ready")).is_some());
    }
}
