//! Daemon configuration, validated before any component starts.

use chrono::NaiveDate;
use chrono_tz::Tz;
use herald_jobs::JobConfig;
use herald_scheduler::{SchedulerError, WallClockSpec};
use herald_session::ReconnectPolicy;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must not be empty")]
    Empty(&'static str),

    #[error("no destination group configured, set HERALD_DESTINATION_ID or HERALD_DESTINATION_NAME")]
    NoDestination,

    #[error(transparent)]
    Schedule(#[from] SchedulerError),
}

/// Raw daemon settings as collected from flags and environment.
pub struct DaemonArgs {
    pub bridge_url: String,
    pub reconnect_attempts: u32,
    pub drive_token: String,
    pub pending_folder: String,
    pub done_folder: String,
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub team_name: String,
    pub destination_id: Option<String>,
    pub destination_name: Option<String>,
    pub announcement_time: String,
    pub image_post_time: String,
    pub timezone: String,
    pub announce_now: bool,
    pub post_now: bool,
    pub date: Option<NaiveDate>,
    pub port: u16,
    pub static_dir: Option<String>,
}

/// Configuration for the daemon.
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// Base URL of the messaging bridge.
    pub bridge_url: String,
    /// What to do when the session drops.
    pub reconnect: ReconnectPolicy,
    /// Drive bearer token.
    pub drive_token: String,
    pub gemini_api_key: String,
    pub gemini_model: String,
    /// Locations, destination, and date settings shared by both jobs.
    pub jobs: JobConfig,
    pub announcement_time: WallClockSpec,
    pub image_post_time: WallClockSpec,
    /// Run the announcement once when the session first becomes ready.
    pub announce_now: bool,
    /// Run the image post once when the session first becomes ready.
    pub post_now: bool,
    /// Dashboard port.
    pub port: u16,
    /// Static dashboard files, if any.
    pub static_dir: Option<String>,
}

impl DaemonConfig {
    pub fn from_args(args: DaemonArgs) -> Result<Self, ConfigError> {
        let destination = destination(args.destination_id, args.destination_name)?;
        let timezone = parse_timezone(&args.timezone)?;

        Ok(Self {
            bridge_url: require("bridge url", args.bridge_url)?,
            reconnect: ReconnectPolicy::bounded(args.reconnect_attempts),
            drive_token: require("HERALD_DRIVE_TOKEN", args.drive_token)?,
            gemini_api_key: require("HERALD_GEMINI_API_KEY", args.gemini_api_key)?,
            gemini_model: require("gemini model", args.gemini_model)?,
            jobs: JobConfig {
                pending_location: require("HERALD_PENDING_FOLDER_ID", args.pending_folder)?,
                done_location: require("HERALD_DONE_FOLDER_ID", args.done_folder)?,
                destination,
                timezone,
                date_override: args.date,
                team_name: args.team_name,
            },
            announcement_time: args.announcement_time.parse()?,
            image_post_time: args.image_post_time.parse()?,
            announce_now: args.announce_now,
            post_now: args.post_now,
            port: args.port,
            static_dir: args.static_dir.filter(|dir| !dir.trim().is_empty()),
        })
    }
}

/// Parse an IANA timezone name.
pub fn parse_timezone(name: &str) -> Result<Tz, ConfigError> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| SchedulerError::UnknownTimezone(name.to_string()).into())
}

/// Pick the destination, preferring an explicit chat id over a name.
fn destination(id: Option<String>, name: Option<String>) -> Result<String, ConfigError> {
    [id, name]
        .into_iter()
        .flatten()
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
        .ok_or(ConfigError::NoDestination)
}

fn require(name: &'static str, value: String) -> Result<String, ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Empty(name));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn args() -> DaemonArgs {
        DaemonArgs {
            bridge_url: "http://127.0.0.1:3001".into(),
            reconnect_attempts: 0,
            drive_token: "token".into(),
            pending_folder: "pending".into(),
            done_folder: "done".into(),
            gemini_api_key: "key".into(),
            gemini_model: "gemini-2.0-flash".into(),
            team_name: "Team 25".into(),
            destination_id: None,
            destination_name: Some("Sales Team".into()),
            announcement_time: "09:00".into(),
            image_post_time: "10:30".into(),
            timezone: "Asia/Kolkata".into(),
            announce_now: false,
            post_now: false,
            date: None,
            port: 3000,
            static_dir: None,
        }
    }

    #[test]
    fn test_valid_config() {
        let config = DaemonConfig::from_args(args()).unwrap();
        assert_eq!(config.jobs.destination, "Sales Team");
        assert_eq!(config.jobs.timezone, chrono_tz::Asia::Kolkata);
        assert_eq!(config.announcement_time.to_string(), "09:00");
        assert_eq!(config.image_post_time.to_string(), "10:30");
        assert_eq!(config.reconnect, ReconnectPolicy::disabled());
    }

    #[test]
    fn test_destination_id_preferred() {
        let mut a = args();
        a.destination_id = Some("12345@g.us".into());
        let config = DaemonConfig::from_args(a).unwrap();
        assert_eq!(config.jobs.destination, "12345@g.us");

        let mut a = args();
        a.destination_id = Some("  ".into());
        let config = DaemonConfig::from_args(a).unwrap();
        assert_eq!(config.jobs.destination, "Sales Team");
    }

    #[test]
    fn test_missing_destination() {
        let mut a = args();
        a.destination_name = None;
        assert_eq!(
            DaemonConfig::from_args(a).unwrap_err(),
            ConfigError::NoDestination
        );
    }

    #[test]
    fn test_empty_required_setting() {
        let mut a = args();
        a.pending_folder = String::new();
        assert_eq!(
            DaemonConfig::from_args(a).unwrap_err(),
            ConfigError::Empty("HERALD_PENDING_FOLDER_ID")
        );
    }

    #[test]
    fn test_invalid_time_rejected() {
        let mut a = args();
        a.image_post_time = "25:00".into();
        assert!(matches!(
            DaemonConfig::from_args(a),
            Err(ConfigError::Schedule(SchedulerError::InvalidTime(_)))
        ));
    }

    #[test]
    fn test_unknown_timezone_rejected() {
        assert_eq!(
            parse_timezone("Mars/Olympus").unwrap_err(),
            ConfigError::Schedule(SchedulerError::UnknownTimezone("Mars/Olympus".into()))
        );
        assert_eq!(
            parse_timezone("America/New_York").unwrap(),
            chrono_tz::America::New_York
        );
    }
}
