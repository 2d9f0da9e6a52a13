//! Audit/resume-store errors.

use thiserror::Error;

/// Failure opening or querying one of the SQLite stores. A failure to
/// open at boot is fatal (: "audit-DB unavailable at boot" aborts
/// startup).
#[derive(Debug, Error)]
pub enum AuditError {
    /// The underlying SQLite call failed.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// The blocking database task panicked or was cancelled.
    #[error("database task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
