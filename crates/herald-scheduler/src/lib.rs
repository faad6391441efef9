//! Wall-clock job scheduler for Herald.
//!
//! This crate provides a scheduler that:
//! - Fires daily triggers at local times in a configured timezone
//! - Fires at most once per nominal local date, across DST shifts
//! - Holds manual triggers until the session is ready, then dispatches once
//! - Never backfills firings missed while the process was down

mod error;
mod scheduler;
mod types;

pub use error::SchedulerError;
pub use scheduler::{JobExecutor, ScheduledTrigger, Scheduler};
pub use types::{Firing, WallClockSpec, next_firing, resolve_local};
