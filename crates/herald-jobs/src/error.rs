use herald_core::JobKind;
use thiserror::Error;

/// A trigger arrived while a run of the same kind was active.
///
/// Rejections are expected under overlapping triggers and are not job failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{kind} job already running, trigger rejected")]
pub struct JobRejected {
    pub kind: JobKind,
}
