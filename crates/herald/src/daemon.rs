//! Daemon mode: session, scheduler, jobs, and dashboard in one process.

use std::sync::Arc;
use std::time::Duration;

use herald_core::{EventBus, JobKind};
use herald_drive::DriveClient;
use herald_gemini::GeminiClient;
use herald_jobs::JobRunner;
use herald_scheduler::{JobExecutor, Scheduler};
use herald_session::{BridgeTransport, SessionEvent, SessionManager, SessionPublisher};
use herald_web::{AppState, create_router};
use miette::Result;
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};

use crate::config::DaemonConfig;

/// Pause after ready before listing groups, so the chat list has loaded.
const GROUP_LOG_SETTLE: Duration = Duration::from_secs(5);

/// How long shutdown waits for running jobs.
const JOB_DRAIN_LIMIT: Duration = Duration::from_secs(120);

/// Run the daemon until ctrl-c.
pub async fn run(config: DaemonConfig) -> Result<()> {
    info!(
        announcement = %config.announcement_time,
        image_post = %config.image_post_time,
        timezone = %config.jobs.timezone,
        destination = %config.jobs.destination,
        "starting herald daemon"
    );

    let bus = EventBus::new();

    let transport =
        BridgeTransport::new(config.bridge_url.as_str()).map_err(|e| miette::miette!("{}", e))?;
    let session =
        SessionManager::with_reconnect(Arc::new(transport), bus.clone(), config.reconnect.clone());
    let publisher = SessionPublisher::new(Arc::clone(&session));

    let store =
        DriveClient::new(config.drive_token.as_str()).map_err(|e| miette::miette!("{}", e))?;
    let captioner =
        GeminiClient::new(config.gemini_api_key.as_str(), config.jobs.team_name.as_str())
            .map_err(|e| miette::miette!("{}", e))?
            .with_model(config.gemini_model.as_str());
    info!(model = %captioner.model(), "captioning configured");

    let runner = Arc::new(JobRunner::new(
        Arc::new(store),
        Arc::new(captioner),
        Arc::new(publisher.clone()),
        bus.clone(),
        config.jobs.clone(),
    ));

    // Set up shutdown signal
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("received shutdown signal");
        let _ = shutdown_tx.send(true);
    });

    let scheduler = Scheduler::new(
        config.jobs.timezone,
        session.readiness(),
        job_executor(Arc::clone(&runner)),
    );
    for (time, kind) in [
        (config.announcement_time, JobKind::Announcement),
        (config.image_post_time, JobKind::ImagePost),
    ] {
        let firing = scheduler.schedule(time, kind).await;
        info!(kind = %kind, next = %firing.at, date = %firing.date, "trigger scheduled");
    }

    if config.announce_now {
        scheduler.trigger_manually(JobKind::Announcement, shutdown_rx.clone());
    }
    if config.post_now {
        scheduler.trigger_manually(JobKind::ImagePost, shutdown_rx.clone());
    }

    tokio::spawn(log_groups_on_ready(
        session.subscribe(),
        publisher,
        shutdown_rx.clone(),
    ));

    session.start().await;

    let router = create_router(
        AppState {
            events: bus.clone(),
            session: session.readiness(),
            runner: Arc::clone(&runner),
        },
        config.static_dir.as_deref(),
    );
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port))
        .await
        .map_err(|e| miette::miette!("failed to bind dashboard port {}: {}", config.port, e))?;
    info!(port = config.port, "dashboard listening");

    let mut web_shutdown = shutdown_rx.clone();
    let web = tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                let _ = web_shutdown.wait_for(|stop| *stop).await;
            })
            .await
    });

    scheduler.run(shutdown_rx).await;

    info!("shutting down");
    // Let in-flight jobs finish while the session can still send.
    runner.drain(JOB_DRAIN_LIMIT).await;
    session.shutdown().await;
    match web.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(error = %e, "dashboard server error"),
        Err(e) => warn!(error = %e, "dashboard task ended abnormally"),
    }

    info!("herald daemon stopped");
    Ok(())
}

/// Scheduler callback that runs jobs on the shared runner.
fn job_executor(runner: Arc<JobRunner>) -> JobExecutor {
    Arc::new(move |kind| {
        let runner = Arc::clone(&runner);
        Box::pin(async move {
            // Rejections are already logged and published by the runner.
            if let Err(e) = runner.run(kind).await {
                debug!(error = %e, "scheduled firing dropped");
            }
        })
    })
}

/// Log the visible groups each time the session becomes ready.
async fn log_groups_on_ready(
    mut events: broadcast::Receiver<SessionEvent>,
    publisher: SessionPublisher,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    loop {
        let event = tokio::select! {
            event = events.recv() => event,
            _ = shutdown_rx.wait_for(|stop| *stop) => return,
        };

        match event {
            Ok(SessionEvent::Ready) => {}
            Ok(_) => continue,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                debug!(skipped, "group logger lagged behind session events");
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => return,
        }

        tokio::time::sleep(GROUP_LOG_SETTLE).await;
        match publisher.list_groups().await {
            Ok(groups) => {
                info!(count = groups.len(), "groups visible to this session");
                for group in groups {
                    info!(name = %group.name, id = %group.id, "group");
                }
            }
            Err(e) => warn!(error = %e, "failed to list groups"),
        }
    }
}
