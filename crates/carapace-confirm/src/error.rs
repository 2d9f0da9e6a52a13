//! Confirmation gate errors.

use thiserror::Error;

/// Failure operating on the confirmation gate.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfirmError {
    /// `request(id, ...)` was called with an id already pending .
    #[error("confirmation id {0} is already pending")]
    DuplicateId(String),
    /// `approve`/`deny`/`cancel` referenced an id with no pending entry
    /// (already resolved, or never requested).
    #[error("confirmation id {0} is not pending")]
    NotPending(String),
}
