//! Job runner with per-kind mutual exclusion.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use herald_core::{
    Captioner, ContentStore, DashboardEvent, DayCategory, EventBus, IMAGE_MIME_PREFIX, JobKind,
    JobOutcome, JobRun, PendingItem, Publisher, SessionError,
};
use rand::seq::SliceRandom;
use serde_json::json;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::{FALLBACK_CAPTION, JobConfig, JobRejected, fallback_greeting};

/// Runs announcement and image-post jobs.
///
/// Each kind has a single-slot semaphore: a run holds the permit for its whole
/// duration, and triggers that find it taken are rejected.
pub struct JobRunner {
    store: Arc<dyn ContentStore>,
    captioner: Arc<dyn Captioner>,
    publisher: Arc<dyn Publisher>,
    bus: EventBus,
    config: JobConfig,
    announcement_slot: Arc<Semaphore>,
    image_post_slot: Arc<Semaphore>,
}

impl JobRunner {
    pub fn new(
        store: Arc<dyn ContentStore>,
        captioner: Arc<dyn Captioner>,
        publisher: Arc<dyn Publisher>,
        bus: EventBus,
        config: JobConfig,
    ) -> Self {
        Self {
            store,
            captioner,
            publisher,
            bus,
            config,
            announcement_slot: Arc::new(Semaphore::new(1)),
            image_post_slot: Arc::new(Semaphore::new(1)),
        }
    }

    pub fn config(&self) -> &JobConfig {
        &self.config
    }

    /// Whether a run of `kind` is active.
    pub fn is_running(&self, kind: JobKind) -> bool {
        self.slot(kind).available_permits() == 0
    }

    /// Run `kind` to completion on the current task.
    pub async fn run(&self, kind: JobKind) -> Result<JobRun, JobRejected> {
        let permit = self.acquire(kind)?;
        Ok(self.execute(kind, permit).await)
    }

    /// Claim the slot for `kind` now and run it on a spawned task.
    pub fn spawn(self: &Arc<Self>, kind: JobKind) -> Result<JoinHandle<JobRun>, JobRejected> {
        let permit = self.acquire(kind)?;
        let this = Arc::clone(self);
        Ok(tokio::spawn(async move { this.execute(kind, permit).await }))
    }

    /// Wait for active runs to finish, then refuse new ones.
    ///
    /// Returns `false` if a run was still active after `limit`.
    pub async fn drain(&self, limit: Duration) -> bool {
        let idle = async {
            let _announcement = self.announcement_slot.acquire().await;
            let _image_post = self.image_post_slot.acquire().await;
        };
        let drained = tokio::time::timeout(limit, idle).await.is_ok();
        self.announcement_slot.close();
        self.image_post_slot.close();

        if drained {
            info!("job runner drained");
        } else {
            warn!(limit_secs = limit.as_secs(), "jobs still running after drain timeout");
        }
        drained
    }

    fn slot(&self, kind: JobKind) -> &Arc<Semaphore> {
        match kind {
            JobKind::Announcement => &self.announcement_slot,
            JobKind::ImagePost => &self.image_post_slot,
        }
    }

    fn acquire(&self, kind: JobKind) -> Result<OwnedSemaphorePermit, JobRejected> {
        Arc::clone(self.slot(kind)).try_acquire_owned().map_err(|_| {
            warn!(kind = %kind, "job already running, trigger rejected");
            self.bus
                .publish(DashboardEvent::with_data("job_rejected", json!({ "kind": kind })));
            self.bus
                .log(format!("{} is already running, trigger ignored", kind));
            JobRejected { kind }
        })
    }

    #[tracing::instrument(skip_all, fields(kind = %kind))]
    async fn execute(&self, kind: JobKind, _permit: OwnedSemaphorePermit) -> JobRun {
        let started_at = Utc::now();
        info!("job started");
        self.bus
            .publish(DashboardEvent::with_data("job_started", json!({ "kind": kind })));
        self.bus.log(format!("Starting {} job", kind));

        let outcome = match kind {
            JobKind::Announcement => self.announcement().await,
            JobKind::ImagePost => self.image_post().await,
        };

        let run = JobRun {
            kind,
            started_at,
            finished_at: Utc::now(),
            outcome,
        };

        match &run.outcome {
            JobOutcome::Success => {
                info!("job succeeded");
                self.bus.log(format!("{} job completed", kind));
            }
            JobOutcome::SkippedNoContent => {
                info!("job skipped, nothing to post");
                self.bus.log(format!("{} job skipped, nothing pending", kind));
            }
            JobOutcome::Failed { reason } => {
                error!(reason = %reason, "job failed");
                self.bus.log(format!("{} job failed: {}", kind, reason));
            }
        }
        self.bus.publish(DashboardEvent::with_data(
            "job_finished",
            json!({ "kind": run.kind, "outcome": run.outcome }),
        ));

        run
    }

    async fn image_post(&self) -> JobOutcome {
        let candidates: Vec<PendingItem> = match self
            .store
            .list(&self.config.pending_location, IMAGE_MIME_PREFIX)
            .await
        {
            Ok(items) => items.into_iter().filter(PendingItem::is_image).collect(),
            Err(e) => return JobOutcome::failed(format!("listing pending items failed: {}", e)),
        };

        let picked = {
            let mut rng = rand::thread_rng();
            candidates.choose(&mut rng).cloned()
        };
        let Some(item) = picked else {
            info!(location = %self.config.pending_location, "no pending images");
            return JobOutcome::SkippedNoContent;
        };
        info!(
            item_id = %item.id,
            name = %item.display_name,
            candidates = candidates.len(),
            "selected pending image"
        );

        let bytes = match self.store.fetch(&item.id).await {
            Ok(bytes) => bytes,
            Err(e) => {
                return JobOutcome::failed(format!(
                    "fetching {} failed: {}",
                    item.display_name, e
                ));
            }
        };

        let caption = match self.captioner.describe_image(&bytes, &item.mime_type).await {
            Ok(caption) => caption,
            Err(e) => {
                warn!(error = %e, "caption generation failed, using fallback caption");
                self.bus.log("Caption unavailable, using fallback caption");
                FALLBACK_CAPTION.to_string()
            }
        };

        if !self.publisher.is_ready() {
            return JobOutcome::failed(SessionError::NotReady.to_string());
        }
        if let Err(e) = self
            .publisher
            .send_image(&self.config.destination, &bytes, &caption, &item.mime_type)
            .await
        {
            return publish_failure(e);
        }
        self.bus.log(format!("Posted {}", item.display_name));

        // The post is out; a failed move leaves the item pending and it may be
        // selected again on a later run.
        if let Err(e) = self
            .store
            .move_to_location(
                &item.id,
                &self.config.pending_location,
                &self.config.done_location,
            )
            .await
        {
            return JobOutcome::failed(format!(
                "posted {} but archiving failed: {}",
                item.display_name, e
            ));
        }
        info!(item_id = %item.id, "archived posted image");

        JobOutcome::Success
    }

    async fn announcement(&self) -> JobOutcome {
        let date = self.config.announcement_date();
        let category = DayCategory::for_date(date);
        info!(date = %date, category = ?category, "preparing announcement");

        let text = match self.captioner.greeting(date, category).await {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "greeting generation failed, using fallback greeting");
                self.bus.log("Greeting unavailable, using fallback greeting");
                fallback_greeting(date, category, &self.config.team_name)
            }
        };

        if !self.publisher.is_ready() {
            return JobOutcome::failed(SessionError::NotReady.to_string());
        }
        if let Err(e) = self
            .publisher
            .send_text(&self.config.destination, &text)
            .await
        {
            return publish_failure(e);
        }

        JobOutcome::Success
    }
}

fn publish_failure(e: SessionError) -> JobOutcome {
    match e {
        SessionError::NotReady => JobOutcome::failed(e.to_string()),
        other => JobOutcome::failed(format!("publish failed: {}", other)),
    }
}
