//! Herald: scheduled group publisher
//!
//! Main binary with subcommands:
//! - `daemon`: session, scheduler, jobs, and dashboard
//! - `groups`: list the groups the linked account can post to
//! - `folders`: list Drive folders, to find folder ids
//! - `check-access`: report what the credentials may do in the pending and done folders
//! - `greeting-samples`: print a regular-day and an end-of-week greeting

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use miette::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Parse boolean from environment variable, accepting common truthy values.
/// Accepts "1", "true", "yes", "on" (case-insensitive) as true.
/// Accepts "0", "false", "no", "off", "" (case-insensitive) as false.
fn parse_bool_env(s: &str) -> Result<bool, String> {
    match s.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(format!(
            "invalid boolean value '{}', expected 1/true/yes/on or 0/false/no/off",
            s
        )),
    }
}

mod commands;
mod config;
mod daemon;

#[derive(Parser)]
#[command(name = "herald")]
#[command(about = "Scheduled image posts and greetings for a messaging group", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Connection to the messaging bridge sidecar.
#[derive(Args, Clone)]
struct BridgeArgs {
    /// Base URL of the bridge
    #[arg(long, env = "HERALD_BRIDGE_URL", default_value = "http://127.0.0.1:3001")]
    bridge_url: String,

    /// Reconnect attempts after the session drops (0 disables)
    #[arg(long, env = "HERALD_RECONNECT_ATTEMPTS", default_value = "0")]
    reconnect_attempts: u32,
}

/// Drive credentials.
#[derive(Args, Clone)]
struct DriveArgs {
    /// OAuth bearer token with Drive scope
    #[arg(long, env = "HERALD_DRIVE_TOKEN", hide_env_values = true)]
    drive_token: String,
}

/// Pending and done folders.
#[derive(Args, Clone)]
struct FolderArgs {
    /// Folder holding images not yet posted
    #[arg(long, env = "HERALD_PENDING_FOLDER_ID")]
    pending_folder: String,

    /// Folder posted images are moved to
    #[arg(long, env = "HERALD_DONE_FOLDER_ID")]
    done_folder: String,
}

/// Captioning service.
#[derive(Args, Clone)]
struct GeminiArgs {
    /// Gemini API key
    #[arg(long, env = "HERALD_GEMINI_API_KEY", hide_env_values = true)]
    gemini_api_key: String,

    /// Gemini model
    #[arg(long, env = "HERALD_GEMINI_MODEL", default_value = herald_gemini::DEFAULT_MODEL)]
    gemini_model: String,

    /// Team name used in prompts and fallback greetings
    #[arg(long, env = "HERALD_TEAM_NAME", default_value = "Team 25")]
    team_name: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the daemon (session, scheduler, dashboard)
    Daemon {
        #[command(flatten)]
        bridge: BridgeArgs,

        #[command(flatten)]
        drive: DriveArgs,

        #[command(flatten)]
        folders: FolderArgs,

        #[command(flatten)]
        gemini: GeminiArgs,

        /// Group chat id to post to (takes precedence over the name)
        #[arg(long, env = "HERALD_DESTINATION_ID")]
        destination_id: Option<String>,

        /// Group name (or part of it) to post to
        #[arg(long, env = "HERALD_DESTINATION_NAME")]
        destination_name: Option<String>,

        /// Daily announcement time, HH:MM
        #[arg(long, env = "HERALD_ANNOUNCEMENT_TIME", default_value = "09:00")]
        announcement_time: String,

        /// Daily image post time, HH:MM
        #[arg(long, env = "HERALD_IMAGE_POST_TIME", default_value = "10:30")]
        image_post_time: String,

        /// IANA timezone the times are in
        #[arg(long, env = "HERALD_TIMEZONE", default_value = "Asia/Kolkata")]
        timezone: String,

        /// Send the announcement once as soon as the session is ready
        #[arg(long, env = "HERALD_ANNOUNCE_NOW", value_parser = parse_bool_env, default_value = "false")]
        announce_now: bool,

        /// Post an image once as soon as the session is ready
        #[arg(long, env = "HERALD_POST_NOW", value_parser = parse_bool_env, default_value = "false")]
        post_now: bool,

        /// Announce for this date instead of today, YYYY-MM-DD
        #[arg(long, env = "HERALD_DATE")]
        date: Option<NaiveDate>,

        /// Dashboard port
        #[arg(long, env = "HERALD_PORT", default_value = "3000")]
        port: u16,

        /// Directory of static dashboard files
        #[arg(long, env = "HERALD_STATIC_DIR")]
        static_dir: Option<String>,
    },

    /// List groups once the session is ready
    Groups {
        #[command(flatten)]
        bridge: BridgeArgs,
    },

    /// List Drive folders, optionally only those inside a parent
    Folders {
        #[command(flatten)]
        drive: DriveArgs,

        /// Parent folder id (all visible folders if omitted)
        parent: Option<String>,
    },

    /// Check access to the pending and done folders
    CheckAccess {
        #[command(flatten)]
        drive: DriveArgs,

        #[command(flatten)]
        folders: FolderArgs,
    },

    /// Print today's greeting and the next end-of-week greeting
    GreetingSamples {
        #[command(flatten)]
        gemini: GeminiArgs,

        /// IANA timezone "today" is computed in
        #[arg(long, env = "HERALD_TIMEZONE", default_value = "Asia/Kolkata")]
        timezone: String,

        /// Use this date as today, YYYY-MM-DD
        #[arg(long)]
        date: Option<NaiveDate>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "herald=info".to_string()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Daemon {
            bridge,
            drive,
            folders,
            gemini,
            destination_id,
            destination_name,
            announcement_time,
            image_post_time,
            timezone,
            announce_now,
            post_now,
            date,
            port,
            static_dir,
        } => {
            let config = config::DaemonConfig::from_args(config::DaemonArgs {
                bridge_url: bridge.bridge_url,
                reconnect_attempts: bridge.reconnect_attempts,
                drive_token: drive.drive_token,
                pending_folder: folders.pending_folder,
                done_folder: folders.done_folder,
                gemini_api_key: gemini.gemini_api_key,
                gemini_model: gemini.gemini_model,
                team_name: gemini.team_name,
                destination_id,
                destination_name,
                announcement_time,
                image_post_time,
                timezone,
                announce_now,
                post_now,
                date,
                port,
                static_dir,
            })
            .map_err(|e| miette::miette!("{}", e))?;

            daemon::run(config).await?;
        }
        Commands::Groups { bridge } => {
            commands::groups(&bridge.bridge_url).await?;
        }
        Commands::Folders { drive, parent } => {
            commands::folders(&drive.drive_token, parent.as_deref()).await?;
        }
        Commands::CheckAccess { drive, folders } => {
            commands::check_access(
                &drive.drive_token,
                &folders.pending_folder,
                &folders.done_folder,
            )
            .await?;
        }
        Commands::GreetingSamples {
            gemini,
            timezone,
            date,
        } => {
            let timezone = config::parse_timezone(&timezone).map_err(|e| miette::miette!("{}", e))?;
            commands::greeting_samples(
                &gemini.gemini_api_key,
                &gemini.gemini_model,
                &gemini.team_name,
                timezone,
                date,
            )
            .await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bool_env() {
        for truthy in ["1", "true", "YES", "On"] {
            assert_eq!(parse_bool_env(truthy), Ok(true));
        }
        for falsy in ["0", "false", "No", "off", ""] {
            assert_eq!(parse_bool_env(falsy), Ok(false));
        }
        assert!(parse_bool_env("maybe").is_err());
    }

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_folders_parent_is_optional() {
        let cli = Cli::try_parse_from(["herald", "folders", "--drive-token", "t"]).unwrap();
        let Commands::Folders { parent, .. } = cli.command else {
            panic!("expected folders command");
        };
        assert_eq!(parent, None);

        let cli =
            Cli::try_parse_from(["herald", "folders", "--drive-token", "t", "root-id"]).unwrap();
        let Commands::Folders { parent, .. } = cli.command else {
            panic!("expected folders command");
        };
        assert_eq!(parent.as_deref(), Some("root-id"));
    }

    #[test]
    fn test_daemon_defaults() {
        let cli = Cli::try_parse_from([
            "herald",
            "daemon",
            "--drive-token",
            "t",
            "--pending-folder",
            "p",
            "--done-folder",
            "d",
            "--gemini-api-key",
            "k",
            "--destination-name",
            "Sales",
        ])
        .unwrap();

        let Commands::Daemon {
            announcement_time,
            image_post_time,
            timezone,
            port,
            announce_now,
            bridge,
            ..
        } = cli.command
        else {
            panic!("expected daemon command");
        };
        assert_eq!(announcement_time, "09:00");
        assert_eq!(image_post_time, "10:30");
        assert_eq!(timezone, "Asia/Kolkata");
        assert_eq!(port, 3000);
        assert!(!announce_now);
        assert_eq!(bridge.reconnect_attempts, 0);
    }
}
