//! Convenience re-exports.

pub use crate::audit::{AuditLog, AuditRow};
pub use crate::error::AuditError;
pub use crate::resume::{ResumeToken, ResumeTokenStore};
