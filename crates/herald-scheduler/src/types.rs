//! Trigger types and wall-clock resolution.

use std::fmt;
use std::str::FromStr;

use chrono::offset::LocalResult;
use chrono::{DateTime, Days, Duration, NaiveDate, NaiveTime, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use serde::{Serialize, Serializer};

use crate::SchedulerError;

/// Longest forward step when a local time falls in a DST gap.
/// Real-world gaps are at most a couple of hours.
const MAX_GAP_MINUTES: u32 = 24 * 60;

/// A daily local time of day, minute precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WallClockSpec {
    time: NaiveTime,
}

impl WallClockSpec {
    pub fn new(hour: u32, minute: u32) -> Result<Self, SchedulerError> {
        NaiveTime::from_hms_opt(hour, minute, 0)
            .map(|time| Self { time })
            .ok_or_else(|| SchedulerError::InvalidTime(format!("{:02}:{:02}", hour, minute)))
    }

    pub fn hour(&self) -> u32 {
        self.time.hour()
    }

    pub fn minute(&self) -> u32 {
        self.time.minute()
    }

    pub fn time(&self) -> NaiveTime {
        self.time
    }
}

impl FromStr for WallClockSpec {
    type Err = SchedulerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || SchedulerError::InvalidTime(s.to_string());
        let (hour, minute) = s.trim().split_once(':').ok_or_else(invalid)?;
        if hour.is_empty() || hour.len() > 2 || minute.len() != 2 {
            return Err(invalid());
        }
        let hour: u32 = hour.parse().map_err(|_| invalid())?;
        let minute: u32 = minute.parse().map_err(|_| invalid())?;
        Self::new(hour, minute).map_err(|_| invalid())
    }
}

impl fmt::Display for WallClockSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

impl Serialize for WallClockSpec {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A planned firing: the nominal local date it belongs to and the instant it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Firing {
    pub date: NaiveDate,
    pub at: DateTime<Utc>,
}

/// Resolve `spec` on local `date` in `tz` to a single instant.
///
/// An ambiguous local time (clocks fall back) resolves to its earliest
/// occurrence. A nonexistent one (clocks spring forward) resolves to the
/// first valid local minute after the gap.
pub fn resolve_local(spec: WallClockSpec, tz: Tz, date: NaiveDate) -> DateTime<Utc> {
    let naive = date.and_time(spec.time);
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(at) => at.with_timezone(&Utc),
        LocalResult::Ambiguous(earliest, _) => earliest.with_timezone(&Utc),
        LocalResult::None => {
            let mut probe = naive;
            for _ in 0..MAX_GAP_MINUTES {
                probe += Duration::minutes(1);
                if let Some(at) = tz.from_local_datetime(&probe).earliest() {
                    return at.with_timezone(&Utc);
                }
            }
            Utc.from_utc_datetime(&naive)
        }
    }
}

/// The next firing of `spec` strictly after `after`.
///
/// Dates up to and including `last_fired` are never planned again, so a
/// registration fires at most once per nominal local date even if the clock
/// steps backwards.
pub fn next_firing(
    spec: WallClockSpec,
    tz: Tz,
    after: DateTime<Utc>,
    last_fired: Option<NaiveDate>,
) -> Firing {
    let mut date = after.with_timezone(&tz).date_naive();
    if let Some(last) = last_fired {
        if date <= last {
            date = last + Days::new(1);
        }
    }

    loop {
        let at = resolve_local(spec, tz, date);
        if at > after {
            return Firing { date, at };
        }
        date = date + Days::new(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_wall_clock() {
        let spec: WallClockSpec = "09:00".parse().unwrap();
        assert_eq!((spec.hour(), spec.minute()), (9, 0));
        let spec: WallClockSpec = "7:05".parse().unwrap();
        assert_eq!(spec.to_string(), "07:05");
    }

    #[test]
    fn test_parse_rejects_bad_times() {
        for bad in ["24:00", "12:60", "1230", "ab:cd", "12:5", "", ":30", "123:00"] {
            assert!(bad.parse::<WallClockSpec>().is_err(), "{bad} accepted");
        }
    }

    #[test]
    fn test_next_firing_same_day_and_next_day() {
        let spec = WallClockSpec::new(9, 0).unwrap();
        let tz = chrono_tz::Asia::Kolkata;

        // 02:00 UTC is 07:30 IST, so 09:00 IST today (03:30 UTC) is next.
        let firing = next_firing(spec, tz, utc("2026-10-14T02:00:00Z"), None);
        assert_eq!(firing.date, date(2026, 10, 14));
        assert_eq!(firing.at, utc("2026-10-14T03:30:00Z"));

        // Exactly at the firing instant, the next one is tomorrow.
        let firing = next_firing(spec, tz, utc("2026-10-14T03:30:00Z"), None);
        assert_eq!(firing.date, date(2026, 10, 15));
    }

    #[test]
    fn test_spring_forward_gap_fires_after_gap() {
        // 2026-03-08 02:00 EST jumps to 03:00 EDT in New York.
        let spec = WallClockSpec::new(2, 30).unwrap();
        let tz = chrono_tz::America::New_York;

        let at = resolve_local(spec, tz, date(2026, 3, 8));
        assert_eq!(at, utc("2026-03-08T07:00:00Z"));
    }

    #[test]
    fn test_fall_back_ambiguous_fires_earliest_once() {
        // 2026-11-01 01:00-02:00 happens twice in New York.
        let spec = WallClockSpec::new(1, 30).unwrap();
        let tz = chrono_tz::America::New_York;

        let first = next_firing(spec, tz, utc("2026-11-01T04:00:00Z"), None);
        assert_eq!(first.date, date(2026, 11, 1));
        assert_eq!(first.at, utc("2026-11-01T05:30:00Z"));

        // After firing, the second 01:30 (06:30Z) must not be planned.
        let second = next_firing(spec, tz, first.at, Some(first.date));
        assert_eq!(second.date, date(2026, 11, 2));
    }

    #[test]
    fn test_last_fired_blocks_repeat_after_clock_step_back() {
        let spec = WallClockSpec::new(9, 0).unwrap();
        let tz = chrono_tz::UTC;

        // Clock stepped back to before today's firing after it already ran.
        let firing = next_firing(
            spec,
            tz,
            utc("2026-10-14T08:00:00Z"),
            Some(date(2026, 10, 14)),
        );
        assert_eq!(firing.date, date(2026, 10, 15));
        assert_eq!(firing.at, utc("2026-10-15T09:00:00Z"));
    }
}
