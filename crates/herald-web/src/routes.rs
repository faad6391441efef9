//! Web routes.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use herald_core::{DashboardEvent, EventBus, JobKind, SessionState};
use herald_jobs::JobRunner;
use serde_json::json;
use tokio::sync::watch;
use tower_http::services::ServeDir;
use tracing::info;

use crate::WebError;
use crate::sse::create_sse_stream;

/// Shared state for the web server.
pub struct AppState {
    pub events: EventBus,
    pub session: watch::Receiver<SessionState>,
    pub runner: Arc<JobRunner>,
}

/// Create the web router.
///
/// If `static_dir` is given, unmatched paths are served from it.
pub fn create_router(state: AppState, static_dir: Option<&str>) -> Router {
    let router = Router::new()
        .route("/health", get(health))
        .route("/events", get(events))
        .route("/api/trigger/{kind}", post(trigger))
        .with_state(Arc::new(state));

    match static_dir {
        Some(dir) => router.fallback_service(ServeDir::new(dir)),
        None => router,
    }
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let session = *state.session.borrow();
    Json(json!({
        "status": "ok",
        "session": session,
        "ready": session.is_ready(),
    }))
}

async fn events(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    // Subscribe before reading state so a transition in between is not lost.
    let rx = state.events.subscribe();
    let session = *state.session.borrow();

    let mut initial = vec![DashboardEvent::with_data(
        "status",
        json!({ "session": session, "ready": session.is_ready() }),
    )];
    if session.is_ready() {
        initial.push(DashboardEvent::new("ready"));
    }

    info!("dashboard observer connected");
    create_sse_stream(initial, rx)
}

async fn trigger(
    State(state): State<Arc<AppState>>,
    Path(kind): Path<String>,
) -> Result<impl IntoResponse, WebError> {
    let kind: JobKind = kind.parse()?;

    if !state.session.borrow().is_ready() {
        state
            .events
            .log(format!("Cannot run {}: session not ready", kind));
        return Err(WebError::NotReady);
    }

    state.runner.spawn(kind)?;
    info!(kind = %kind, "manual trigger dispatched from dashboard");

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({ "status": "dispatched", "kind": kind })),
    ))
}
