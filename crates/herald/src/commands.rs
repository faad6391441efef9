//! One-off operator commands.

use std::sync::Arc;

use chrono::{Datelike, Duration, NaiveDate, Utc, Weekday};
use chrono_tz::Tz;
use herald_core::{Captioner, DayCategory, EventBus};
use herald_drive::DriveClient;
use herald_gemini::GeminiClient;
use herald_jobs::fallback_greeting;
use herald_session::{BridgeTransport, SessionManager, SessionPublisher};
use miette::Result;
use tokio::sync::watch;
use tracing::{info, warn};

/// Start a session, print its groups once ready, and disconnect.
pub async fn groups(bridge_url: &str) -> Result<()> {
    let transport = BridgeTransport::new(bridge_url).map_err(|e| miette::miette!("{}", e))?;
    let session = SessionManager::new(Arc::new(transport), EventBus::new());
    let publisher = SessionPublisher::new(Arc::clone(&session));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        let _ = shutdown_tx.send(true);
    });

    session.start().await;
    info!("waiting for session to be ready");
    if !session.wait_until_ready(shutdown_rx).await {
        session.shutdown().await;
        return Err(miette::miette!("interrupted before the session was ready"));
    }

    let result = publisher.list_groups().await;
    session.shutdown().await;
    let groups = result.map_err(|e| miette::miette!("failed to list groups: {}", e))?;

    if groups.is_empty() {
        println!("No groups found.");
    }
    for group in groups {
        println!("{}\t{}", group.id, group.name);
    }
    Ok(())
}

/// Print the subfolders of `parent`, or every visible folder without one.
pub async fn folders(token: &str, parent: Option<&str>) -> Result<()> {
    let drive = DriveClient::new(token).map_err(|e| miette::miette!("{}", e))?;
    let folders = match parent {
        Some(parent) => drive.list_subfolders(parent).await,
        None => drive.list_all_folders().await,
    }
    .map_err(|e| miette::miette!("failed to list folders: {}", e))?;

    if folders.is_empty() {
        match parent {
            Some(parent) => println!("No folders found in {}.", parent),
            None => println!("No folders visible to these credentials."),
        }
    }
    for folder in folders {
        println!("{}\t{}", folder.id, folder.name);
    }
    Ok(())
}

/// Report access to the pending and done folders.
///
/// Fails if either folder cannot be read or cannot take new files.
pub async fn check_access(token: &str, pending: &str, done: &str) -> Result<()> {
    let drive = DriveClient::new(token).map_err(|e| miette::miette!("{}", e))?;
    let mut problems = Vec::new();

    for (label, folder) in [("pending", pending), ("done", done)] {
        match drive.folder_capabilities(folder).await {
            Ok(caps) => {
                println!(
                    "{} ({}): list={} add={} remove={}",
                    label,
                    folder,
                    caps.can_list_children,
                    caps.can_add_children,
                    caps.can_trash_children
                );
                if !caps.allows_archiving() {
                    problems.push(format!(
                        "{} folder does not allow listing and adding files",
                        label
                    ));
                }
            }
            Err(e) => {
                println!("{} ({}): not accessible: {}", label, folder, e);
                problems.push(format!("{} folder is not accessible", label));
            }
        }
    }

    if problems.is_empty() {
        println!("Access looks good.");
        Ok(())
    } else {
        Err(miette::miette!("{}", problems.join("; ")))
    }
}

/// Print a greeting for `today` (or the current date) and for the next end of week.
pub async fn greeting_samples(
    api_key: &str,
    model: &str,
    team_name: &str,
    timezone: Tz,
    today: Option<NaiveDate>,
) -> Result<()> {
    let captioner = GeminiClient::new(api_key, team_name)
        .map_err(|e| miette::miette!("{}", e))?
        .with_model(model);

    let today = today.unwrap_or_else(|| Utc::now().with_timezone(&timezone).date_naive());
    for date in [today, next_end_of_week(today)] {
        let category = DayCategory::for_date(date);
        let text = match captioner.greeting(date, category).await {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, date = %date, "greeting generation failed, showing fallback");
                fallback_greeting(date, category, team_name)
            }
        };
        println!("--- {} ({:?}) ---\n{}\n", date, category, text);
    }
    Ok(())
}

/// The first end-of-week day strictly after `date`.
fn next_end_of_week(date: NaiveDate) -> NaiveDate {
    let from = date.weekday().num_days_from_monday() as i64;
    let target = Weekday::Sun.num_days_from_monday() as i64;
    let ahead = (target - from + 6).rem_euclid(7) + 1;
    date + Duration::days(ahead)
}
