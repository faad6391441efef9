//! Shared building blocks for Herald.
//!
//! This crate holds the pieces every other Herald crate agrees on:
//! - Domain types (session state, pending items, job kinds and runs)
//! - Collaborator traits for the content store, captioner, and publisher
//! - The event bus that fans lifecycle and job events out to observers

mod error;
mod events;
mod traits;
mod types;

pub use error::{CaptionError, SessionError, StoreError};
pub use events::{DashboardEvent, EventBus};
pub use traits::{Captioner, ContentStore, Publisher};
pub use types::{
    DEFAULT_IMAGE_MIME, DayCategory, END_OF_WEEK, IMAGE_MIME_PREFIX, JobKind, JobOutcome, JobRun,
    ParseJobKindError, PendingItem, SessionState, day_line,
};
