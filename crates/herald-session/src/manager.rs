//! Session lifecycle manager.

use std::sync::Arc;
use std::time::Duration;

use backoff::ExponentialBackoff;
use backoff::backoff::Backoff;
use herald_core::{DashboardEvent, EventBus, SessionState};
use serde_json::json;
use tokio::sync::{Mutex, broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::{SessionEvent, SessionTransport, TransportEvent, transition};

/// Capacity of the lifecycle event channel.
const SESSION_EVENT_CAPACITY: usize = 64;

/// Automatic reconnection after the session drops.
///
/// The default makes no attempts: a dropped session stays down until `start`
/// is called again or the process restarts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Consecutive attempts before giving up. Reset once a session reaches ready.
    pub max_attempts: u32,
    pub initial_interval: Duration,
    pub max_interval: Duration,
}

impl ReconnectPolicy {
    pub fn disabled() -> Self {
        Self {
            max_attempts: 0,
            ..Self::default()
        }
    }

    pub fn bounded(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Self::default()
        }
    }

    fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            initial_interval: self.initial_interval,
            max_interval: self.max_interval,
            max_elapsed_time: None,
            ..Default::default()
        }
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 0,
            initial_interval: Duration::from_secs(2),
            max_interval: Duration::from_secs(120),
        }
    }
}

/// How one connection attempt ended.
enum AttemptEnd {
    Shutdown,
    Dropped { reached_ready: bool },
}

/// Owner of the single messaging session.
///
/// Only this type writes [`SessionState`]; everything else reads snapshots.
pub struct SessionManager {
    transport: Arc<dyn SessionTransport>,
    state_tx: watch::Sender<SessionState>,
    events_tx: broadcast::Sender<SessionEvent>,
    bus: EventBus,
    reconnect: ReconnectPolicy,
    shutdown_tx: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl SessionManager {
    /// Create a manager for `transport`. Nothing connects until [`SessionManager::start`].
    pub fn new(transport: Arc<dyn SessionTransport>, bus: EventBus) -> Arc<Self> {
        Self::with_reconnect(transport, bus, ReconnectPolicy::default())
    }

    pub fn with_reconnect(
        transport: Arc<dyn SessionTransport>,
        bus: EventBus,
        reconnect: ReconnectPolicy,
    ) -> Arc<Self> {
        let (state_tx, _) = watch::channel(SessionState::Disconnected);
        let (events_tx, _) = broadcast::channel(SESSION_EVENT_CAPACITY);
        let (shutdown_tx, _) = watch::channel(false);
        Arc::new(Self {
            transport,
            state_tx,
            events_tx,
            bus,
            reconnect,
            shutdown_tx,
            task: Mutex::new(None),
        })
    }

    /// Begin establishing the session.
    ///
    /// Returns `false` without doing anything if a lifecycle task is already
    /// running. Failures are reported as `Disconnected` events, not returned.
    pub async fn start(self: &Arc<Self>) -> bool {
        let mut task = self.task.lock().await;
        if let Some(handle) = task.as_ref() {
            if !handle.is_finished() {
                debug!("session already starting or started");
                return false;
            }
        }

        if *self.shutdown_tx.borrow() {
            warn!("session manager is shut down, not starting");
            return false;
        }

        info!("starting messaging session");
        let this = Arc::clone(self);
        let shutdown_rx = self.shutdown_tx.subscribe();
        *task = Some(tokio::spawn(async move {
            this.run_lifecycle(shutdown_rx).await;
        }));
        true
    }

    /// Current lifecycle state.
    pub fn current_state(&self) -> SessionState {
        *self.state_tx.borrow()
    }

    pub fn is_ready(&self) -> bool {
        self.current_state().is_ready()
    }

    /// Snapshot channel of the lifecycle state.
    pub fn readiness(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }

    /// Subscribe to lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events_tx.subscribe()
    }

    /// Wait for the first moment the session is ready.
    ///
    /// Returns `false` if `shutdown` fires first.
    pub async fn wait_until_ready(&self, mut shutdown: watch::Receiver<bool>) -> bool {
        let mut readiness = self.readiness();
        tokio::select! {
            result = readiness.wait_for(|state| state.is_ready()) => result.is_ok(),
            _ = shutdown.wait_for(|stop| *stop) => false,
        }
    }

    /// Stop the lifecycle task and disconnect the transport.
    pub async fn shutdown(&self) {
        self.shutdown_tx.send_replace(true);
        let handle = self.task.lock().await.take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!(error = %e, "session lifecycle task ended abnormally");
            }
        }
    }

    pub(crate) fn transport(&self) -> &Arc<dyn SessionTransport> {
        &self.transport
    }

    async fn run_lifecycle(&self, mut shutdown_rx: watch::Receiver<bool>) {
        let mut backoff = self.reconnect.backoff();
        let mut attempts = 0u32;

        loop {
            match self.run_attempt(&mut shutdown_rx).await {
                AttemptEnd::Shutdown => break,
                AttemptEnd::Dropped { reached_ready } => {
                    if reached_ready {
                        backoff.reset();
                        attempts = 0;
                    }

                    if attempts >= self.reconnect.max_attempts {
                        if self.reconnect.max_attempts > 0 {
                            warn!(attempts, "session reconnect attempts exhausted");
                        } else {
                            info!("session ended, call start again or restart to reconnect");
                        }
                        break;
                    }
                    attempts += 1;

                    let wait = backoff
                        .next_backoff()
                        .unwrap_or(self.reconnect.max_interval);
                    info!(
                        attempt = attempts,
                        wait_secs = wait.as_secs(),
                        "reconnecting messaging session"
                    );

                    tokio::select! {
                        _ = shutdown_rx.wait_for(|stop| *stop) => break,
                        _ = tokio::time::sleep(wait) => {}
                    }
                }
            }
        }

        debug!("session lifecycle task finished");
    }

    async fn run_attempt(&self, shutdown_rx: &mut watch::Receiver<bool>) -> AttemptEnd {
        let mut events = match self.transport.connect().await {
            Ok(events) => events,
            Err(e) => {
                warn!(error = %e, "failed to connect messaging transport");
                self.apply(TransportEvent::Disconnected(e.to_string()));
                return AttemptEnd::Dropped {
                    reached_ready: false,
                };
            }
        };

        let mut reached_ready = false;
        loop {
            tokio::select! {
                _ = async { shutdown_rx.wait_for(|stop| *stop).await.map(|_| ()) } => {
                    if let Err(e) = self.transport.disconnect().await {
                        warn!(error = %e, "failed to disconnect messaging transport");
                    }
                    self.apply(TransportEvent::Disconnected("shutdown".to_string()));
                    return AttemptEnd::Shutdown;
                }
                event = events.recv() => {
                    let event = event.unwrap_or_else(|| {
                        TransportEvent::Disconnected("transport closed".to_string())
                    });
                    let state = self.apply(event);
                    reached_ready |= state.is_ready();
                    if state == SessionState::Disconnected {
                        return AttemptEnd::Dropped { reached_ready };
                    }
                }
            }
        }
    }

    /// Apply a transport event and return the resulting state.
    fn apply(&self, event: TransportEvent) -> SessionState {
        let current = self.current_state();
        for lifecycle in transition(current, event) {
            self.state_tx.send_replace(lifecycle.state());
            self.announce(&lifecycle);
            if self.events_tx.send(lifecycle).is_err() {
                tracing::trace!("no subscribers for session event");
            }
        }
        self.current_state()
    }

    fn announce(&self, event: &SessionEvent) {
        match event {
            SessionEvent::PairingChallenge(payload) => {
                info!("pairing challenge received, scan it to link the session");
                self.bus
                    .publish(DashboardEvent::with_data("qr", payload.clone()));
                self.bus.log("Pairing code received, waiting for scan");
            }
            SessionEvent::Authenticated => {
                info!("messaging session authenticated");
                self.bus.emit("authenticated");
                self.bus.log("Authenticated, loading chats");
            }
            SessionEvent::Ready => {
                info!("messaging session ready");
                self.bus.emit("ready");
                self.bus.log("Session connected");
            }
            SessionEvent::Disconnected(reason) => {
                warn!(reason = %reason, "messaging session disconnected");
                self.bus.publish(DashboardEvent::with_data(
                    "disconnected",
                    json!({ "reason": reason }),
                ));
                self.bus.log(format!("Disconnected: {}", reason));
            }
        }
    }
}
