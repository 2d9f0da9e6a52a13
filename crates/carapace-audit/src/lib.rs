//! Carapace Audit — the append-only audit log and resume-token store,
//! both backed by SQLite.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]

pub mod audit;
pub mod db;
pub mod error;
pub mod prelude;
pub mod resume;

pub use audit::{AuditLog, AuditRow};
pub use error::AuditError;
pub use resume::{ResumeToken, ResumeTokenStore};
