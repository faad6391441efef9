//! Router behavior with in-memory collaborators.

use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::NaiveDate;
use herald_core::{
    CaptionError, Captioner, ContentStore, DayCategory, EventBus, PendingItem, Publisher,
    SessionError, SessionState, StoreError,
};
use herald_jobs::{JobConfig, JobRunner};
use herald_web::{AppState, create_router};
use tokio::sync::{Notify, watch};
use tower::ServiceExt;

struct EmptyStore;

#[async_trait]
impl ContentStore for EmptyStore {
    async fn list(&self, _: &str, _: &str) -> Result<Vec<PendingItem>, StoreError> {
        Ok(vec![])
    }

    async fn fetch(&self, id: &str) -> Result<Vec<u8>, StoreError> {
        Err(StoreError::NotFound(id.into()))
    }

    async fn move_to_location(&self, _: &str, _: &str, _: &str) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Greeting parks until released so a run can be held open.
struct GatedCaptioner {
    gate: Arc<Notify>,
}

#[async_trait]
impl Captioner for GatedCaptioner {
    async fn describe_image(&self, _: &[u8], _: &str) -> Result<String, CaptionError> {
        Ok("caption".into())
    }

    async fn greeting(&self, _: NaiveDate, _: DayCategory) -> Result<String, CaptionError> {
        self.gate.notified().await;
        Ok("Good morning".into())
    }
}

struct RecordingPublisher {
    session: watch::Receiver<SessionState>,
    sent: Mutex<Vec<String>>,
}

#[async_trait]
impl Publisher for RecordingPublisher {
    fn is_ready(&self) -> bool {
        self.session.borrow().is_ready()
    }

    async fn send_text(&self, _: &str, text: &str) -> Result<(), SessionError> {
        self.sent.lock().unwrap().push(text.into());
        Ok(())
    }

    async fn send_image(&self, _: &str, _: &[u8], _: &str, _: &str) -> Result<(), SessionError> {
        Ok(())
    }
}

struct Fixture {
    state_tx: watch::Sender<SessionState>,
    gate: Arc<Notify>,
    router: axum::Router,
}

fn fixture(initial: SessionState) -> Fixture {
    let (state_tx, state_rx) = watch::channel(initial);
    let gate = Arc::new(Notify::new());
    let bus = EventBus::new();
    let runner = Arc::new(JobRunner::new(
        Arc::new(EmptyStore),
        Arc::new(GatedCaptioner { gate: gate.clone() }),
        Arc::new(RecordingPublisher {
            session: state_rx.clone(),
            sent: Mutex::new(vec![]),
        }),
        bus.clone(),
        JobConfig {
            pending_location: "pending".into(),
            done_location: "done".into(),
            destination: "Sales".into(),
            timezone: chrono_tz::Asia::Kolkata,
            date_override: None,
            team_name: "Team".into(),
        },
    ));
    let router = create_router(
        AppState {
            events: bus,
            session: state_rx,
            runner,
        },
        None,
    );
    Fixture {
        state_tx,
        gate,
        router,
    }
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn post(uri: &str) -> Request<Body> {
    Request::post(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_health_reports_session_state() {
    let f = fixture(SessionState::PairingRequested);

    let response = f
        .router
        .clone()
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["session"], "pairing_requested");
    assert_eq!(body["ready"], false);

    f.state_tx.send_replace(SessionState::Ready);
    let response = f
        .router
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(body_json(response).await["ready"], true);
}

#[tokio::test]
async fn test_trigger_refused_when_not_ready() {
    let f = fixture(SessionState::Disconnected);

    let response = f
        .router
        .oneshot(post("/api/trigger/announcement"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["error"], "session not ready");
}

#[tokio::test]
async fn test_trigger_dispatches_then_rejects_overlap() {
    let f = fixture(SessionState::Ready);

    let response = f
        .router
        .clone()
        .oneshot(post("/api/trigger/morning"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let body = body_json(response).await;
    assert_eq!(body["status"], "dispatched");
    assert_eq!(body["kind"], "announcement");

    // The first run is parked inside the captioner.
    let response = f
        .router
        .clone()
        .oneshot(post("/api/trigger/announcement"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // Other kinds are independent.
    let response = f
        .router
        .clone()
        .oneshot(post("/api/trigger/image_post"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    f.gate.notify_one();
}

#[tokio::test]
async fn test_unknown_job_kind_is_not_found() {
    let f = fixture(SessionState::Ready);
    let response = f.router.oneshot(post("/api/trigger/reboot")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_events_is_an_sse_stream() {
    let f = fixture(SessionState::Ready);
    let response = f
        .router
        .oneshot(Request::get("/events").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-type"],
        "text/event-stream"
    );
}
