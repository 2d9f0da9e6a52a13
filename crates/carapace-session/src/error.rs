//! Session manager errors.

use thiserror::Error;

/// Failure binding a new session.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The group is already at its session cap (; maps onto
    /// `RATE_LIMITED` at the pipeline's authorise stage).
    #[error("group '{group}' already has {count} sessions, at its cap of {cap}")]
    GroupAtCapacity {
        /// The group that is full.
        group: String,
        /// Current session count for the group.
        count: usize,
        /// The configured cap.
        cap: usize,
    },
}
