//! Domain types.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, NaiveDate, Utc, Weekday};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Mime prefix that marks an item as an image.
pub const IMAGE_MIME_PREFIX: &str = "image/";

/// Mime type assumed when the store does not report one.
pub const DEFAULT_IMAGE_MIME: &str = "image/jpeg";

/// The day that gets the end-of-week greeting.
pub const END_OF_WEEK: Weekday = Weekday::Sun;

/// Lifecycle state of the messaging session.
///
/// Transitions run `Disconnected -> PairingRequested -> Authenticated -> Ready`,
/// and any state may drop back to `Disconnected`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// No session, or the last attempt ended.
    #[default]
    Disconnected,
    /// Waiting for the operator to scan a pairing challenge.
    PairingRequested,
    /// Credentials accepted, chat data still loading.
    Authenticated,
    /// Sending is permitted.
    Ready,
}

impl SessionState {
    /// Whether publishing is permitted in this state.
    pub fn is_ready(self) -> bool {
        self == SessionState::Ready
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SessionState::Disconnected => "disconnected",
            SessionState::PairingRequested => "pairing_requested",
            SessionState::Authenticated => "authenticated",
            SessionState::Ready => "ready",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One candidate item in the pending location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingItem {
    /// Store-assigned identifier.
    pub id: String,
    /// Human-readable file name.
    pub display_name: String,
    /// Reported mime type.
    pub mime_type: String,
}

impl PendingItem {
    pub fn new(
        id: impl Into<String>,
        display_name: impl Into<String>,
        mime_type: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            mime_type: mime_type.into(),
        }
    }

    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with(IMAGE_MIME_PREFIX)
    }
}

/// Which fixed task a job run performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    /// The daily text greeting.
    Announcement,
    /// Pick, caption, post, and archive one image.
    ImagePost,
}

impl JobKind {
    pub const ALL: [JobKind; 2] = [JobKind::Announcement, JobKind::ImagePost];

    pub fn as_str(self) -> &'static str {
        match self {
            JobKind::Announcement => "announcement",
            JobKind::ImagePost => "image_post",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a job kind name is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown job kind '{0}', expected announcement or image_post")]
pub struct ParseJobKindError(pub String);

impl FromStr for JobKind {
    type Err = ParseJobKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "announcement" | "morning" | "greeting" => Ok(JobKind::Announcement),
            "image_post" | "image-post" | "post" => Ok(JobKind::ImagePost),
            _ => Err(ParseJobKindError(s.to_string())),
        }
    }
}

/// How a single job run ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobOutcome {
    /// Every step completed.
    Success,
    /// Nothing to post; no side effects happened.
    SkippedNoContent,
    /// A step failed and the remaining steps were abandoned.
    Failed { reason: String },
}

impl JobOutcome {
    pub fn failed(reason: impl Into<String>) -> Self {
        JobOutcome::Failed {
            reason: reason.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, JobOutcome::Success)
    }
}

/// Record of one execution. Lives only as long as the caller keeps it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRun {
    pub kind: JobKind,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub outcome: JobOutcome,
}

/// Which greeting tone a date calls for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayCategory {
    EndOfWeek,
    Regular,
}

impl DayCategory {
    pub fn for_weekday(weekday: Weekday) -> Self {
        if weekday == END_OF_WEEK {
            DayCategory::EndOfWeek
        } else {
            DayCategory::Regular
        }
    }

    pub fn for_date(date: NaiveDate) -> Self {
        Self::for_weekday(date.weekday())
    }
}

/// Date header used in greetings, e.g. `14 Oct 2026 | Wednesday`.
pub fn day_line(date: NaiveDate) -> String {
    date.format("%-d %b %Y | %A").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_day_line_format() {
        let date = NaiveDate::from_ymd_opt(2026, 10, 14).unwrap();
        assert_eq!(day_line(date), "14 Oct 2026 | Wednesday");
        let date = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        assert_eq!(day_line(date), "1 Mar 2026 | Sunday");
    }

    #[test]
    fn test_only_ready_permits_publishing() {
        assert!(SessionState::Ready.is_ready());
        assert!(!SessionState::Disconnected.is_ready());
        assert!(!SessionState::PairingRequested.is_ready());
        assert!(!SessionState::Authenticated.is_ready());
    }

    #[test]
    fn test_job_kind_parse_aliases() {
        assert_eq!("morning".parse::<JobKind>(), Ok(JobKind::Announcement));
        assert_eq!("POST".parse::<JobKind>(), Ok(JobKind::ImagePost));
        assert_eq!("image_post".parse::<JobKind>(), Ok(JobKind::ImagePost));
        assert!("lunch".parse::<JobKind>().is_err());
    }

    #[test]
    fn test_day_category_sunday_is_end_of_week() {
        let sunday = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        let wednesday = NaiveDate::from_ymd_opt(2026, 10, 14).unwrap();
        assert_eq!(DayCategory::for_date(sunday), DayCategory::EndOfWeek);
        assert_eq!(DayCategory::for_date(wednesday), DayCategory::Regular);
    }

    #[test]
    fn test_pending_item_is_image() {
        assert!(PendingItem::new("f1", "house.jpg", "image/jpeg").is_image());
        assert!(!PendingItem::new("f2", "notes.pdf", "application/pdf").is_image());
    }

    #[test]
    fn test_outcome_serializes_with_tag() {
        let json = serde_json::to_value(JobOutcome::failed("boom")).unwrap();
        assert_eq!(json["type"], "failed");
        assert_eq!(json["reason"], "boom");
    }
}
