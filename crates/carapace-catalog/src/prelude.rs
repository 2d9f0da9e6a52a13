//! Convenience re-exports.

pub use crate::catalog::Catalog;
pub use crate::error::{RegistrationError, SchemaViolation, ValidationFailure};
pub use crate::types::{HandlerFailure, SharedHandler, ToolContext, ToolDeclaration, ToolHandler};
