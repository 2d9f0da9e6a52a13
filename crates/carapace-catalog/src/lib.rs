//! Carapace Catalog — the tool registry, schema-complexity budget, and
//! the [`ToolHandler`] seam every tool (built-in or plugin-provided) is
//! dispatched through.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]

pub mod catalog;
pub mod error;
pub mod prelude;
pub mod schema;
pub mod types;

pub use catalog::Catalog;
pub use error::{RegistrationError, SchemaViolation, ValidationFailure};
pub use schema::{validate_arguments, validate_schema_budget, MAX_SCHEMA_DEPTH, MAX_SCHEMA_PROPERTIES};
pub use types::{HandlerFailure, SharedHandler, ToolContext, ToolDeclaration, ToolHandler};
