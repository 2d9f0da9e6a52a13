//! Convenience re-exports.

pub use crate::claims::ClaimRegistry;
pub use crate::error::SessionError;
pub use crate::manager::SessionManager;
pub use crate::session::Session;
