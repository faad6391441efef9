//! Job configuration.

use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;

/// Where jobs read from, archive to, and publish to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobConfig {
    /// Location holding items not yet published.
    pub pending_location: String,
    /// Location published items are moved to.
    pub done_location: String,
    /// Group id or name to publish to.
    pub destination: String,
    /// Timezone the announcement date is computed in.
    pub timezone: Tz,
    /// Fixed announcement date instead of today.
    pub date_override: Option<NaiveDate>,
    /// Team name used in fallback greetings.
    pub team_name: String,
}

impl JobConfig {
    /// The date an announcement is for: the override, or today in the configured timezone.
    pub fn announcement_date(&self) -> NaiveDate {
        self.date_override
            .unwrap_or_else(|| Utc::now().with_timezone(&self.timezone).date_naive())
    }
}
