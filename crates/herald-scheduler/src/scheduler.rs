//! Scheduler implementation.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use herald_core::{JobKind, SessionState};
use serde::Serialize;
use tokio::sync::{RwLock, watch};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::{Firing, WallClockSpec, next_firing};

/// Minimum sleep duration between scheduler checks.
const MIN_SLEEP_SECS: u64 = 1;

/// Maximum sleep duration between scheduler checks.
const MAX_SLEEP_SECS: u64 = 60;

/// A firing later than this is treated as missed and skipped.
const MISSED_GRACE_SECS: i64 = 5 * 60;

/// Type alias for the job executor function.
///
/// The scheduler spawns the returned future and never awaits it.
pub type JobExecutor =
    Arc<dyn Fn(JobKind) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// A registered daily trigger and its next planned firing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScheduledTrigger {
    pub kind: JobKind,
    pub time: WallClockSpec,
    pub next: Firing,
    pub last_fired: Option<NaiveDate>,
}

/// Fires registered job kinds at daily local times.
pub struct Scheduler {
    timezone: Tz,
    executor: JobExecutor,
    readiness: watch::Receiver<SessionState>,
    triggers: RwLock<Vec<ScheduledTrigger>>,
}

impl Scheduler {
    /// Create a scheduler for `timezone`.
    ///
    /// `readiness` gates manual triggers; `executor` is handed each due kind.
    pub fn new(
        timezone: Tz,
        readiness: watch::Receiver<SessionState>,
        executor: JobExecutor,
    ) -> Self {
        Self {
            timezone,
            executor,
            readiness,
            triggers: RwLock::new(Vec::new()),
        }
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// Register `kind` to fire daily at local time `time`.
    ///
    /// Returns the first planned firing.
    pub async fn schedule(&self, time: WallClockSpec, kind: JobKind) -> Firing {
        self.schedule_at(time, kind, Utc::now()).await
    }

    pub(crate) async fn schedule_at(
        &self,
        time: WallClockSpec,
        kind: JobKind,
        now: DateTime<Utc>,
    ) -> Firing {
        let next = next_firing(time, self.timezone, now, None);
        info!(
            kind = %kind,
            time = %time,
            timezone = %self.timezone,
            next = %next.at.with_timezone(&self.timezone),
            "scheduled daily trigger"
        );
        self.triggers.write().await.push(ScheduledTrigger {
            kind,
            time,
            next,
            last_fired: None,
        });
        next
    }

    /// Snapshot of registered triggers.
    pub async fn triggers(&self) -> Vec<ScheduledTrigger> {
        self.triggers.read().await.clone()
    }

    /// Main scheduler loop. Returns once `shutdown_rx` flips to `true`.
    pub async fn run(&self, mut shutdown_rx: watch::Receiver<bool>) {
        info!("scheduler starting");

        loop {
            if *shutdown_rx.borrow() {
                info!("scheduler shutting down");
                break;
            }

            let now = Utc::now();
            self.fire_due(now).await;

            let sleep_duration = self.calculate_sleep_duration(now).await;
            debug!(secs = sleep_duration.as_secs(), "scheduler sleeping");

            tokio::select! {
                result = shutdown_rx.changed() => {
                    if result.is_err() {
                        info!("shutdown channel closed, scheduler stopping");
                        break;
                    }
                    if *shutdown_rx.borrow() {
                        info!("scheduler received shutdown signal");
                    }
                }
                _ = sleep(sleep_duration) => {}
            }
        }

        info!("scheduler shut down gracefully");
    }

    /// Dispatch every trigger due at `now` and plan its next firing.
    ///
    /// Returns the kinds dispatched. Firings older than the grace window are
    /// skipped rather than run late.
    pub async fn fire_due(&self, now: DateTime<Utc>) -> Vec<JobKind> {
        let mut dispatched = Vec::new();
        let mut triggers = self.triggers.write().await;

        for trigger in triggers.iter_mut() {
            if trigger.next.at > now {
                continue;
            }

            let late = now - trigger.next.at;
            if late > Duration::seconds(MISSED_GRACE_SECS) {
                warn!(
                    kind = %trigger.kind,
                    date = %trigger.next.date,
                    late_secs = late.num_seconds(),
                    "missed daily trigger, skipping"
                );
            } else {
                info!(kind = %trigger.kind, date = %trigger.next.date, "daily trigger fired");
                self.dispatch(trigger.kind);
                dispatched.push(trigger.kind);
            }

            trigger.last_fired = Some(trigger.next.date);
            trigger.next = next_firing(trigger.time, self.timezone, now, trigger.last_fired);
            debug!(
                kind = %trigger.kind,
                next = %trigger.next.at.with_timezone(&self.timezone),
                "planned next firing"
            );
        }

        dispatched
    }

    /// Hold a one-off trigger until the session is ready, then dispatch it once.
    ///
    /// The returned task yields `true` if the job was dispatched, `false` if
    /// shutdown arrived first. Readiness flicker while waiting does not cause
    /// extra dispatches.
    pub fn trigger_manually(
        &self,
        kind: JobKind,
        mut shutdown_rx: watch::Receiver<bool>,
    ) -> JoinHandle<bool> {
        let mut readiness = self.readiness.clone();
        let executor = Arc::clone(&self.executor);

        tokio::spawn(async move {
            if !readiness.borrow().is_ready() {
                info!(kind = %kind, "manual trigger waiting for session to be ready");
            }

            let shutdown = async {
                if shutdown_rx.wait_for(|stop| *stop).await.is_err() {
                    // Sender gone without signalling; keep waiting for readiness.
                    std::future::pending::<()>().await;
                }
            };

            let ready = tokio::select! {
                result = readiness.wait_for(|state| state.is_ready()) => result.is_ok(),
                _ = shutdown => false,
            };

            if !ready {
                info!(kind = %kind, "manual trigger abandoned before session was ready");
                return false;
            }

            info!(kind = %kind, "manual trigger dispatched");
            tokio::spawn(executor(kind));
            true
        })
    }

    fn dispatch(&self, kind: JobKind) {
        tokio::spawn((self.executor)(kind));
    }

    /// Time until the next planned firing, clamped to the polling bounds.
    pub async fn calculate_sleep_duration(&self, now: DateTime<Utc>) -> std::time::Duration {
        let triggers = self.triggers.read().await;
        let next_due = triggers.iter().map(|t| t.next.at).min();

        let secs = match next_due {
            Some(next) => {
                let diff = (next - now).num_seconds();
                (diff.max(MIN_SLEEP_SECS as i64) as u64).min(MAX_SLEEP_SECS)
            }
            None => MAX_SLEEP_SECS,
        };

        std::time::Duration::from_secs(secs)
    }
}
