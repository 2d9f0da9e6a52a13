//! The tool catalog : a write-once-at-startup, read-mostly registry
//! of [`ToolDeclaration`]s paired with their [`ToolHandler`]s.
//!
//! Grounded on `astrid-mcp::registry::McpRegistry`'s wrapping pattern:
//! a concurrent map keyed by name, with lookup methods that never block
//! a caller on another caller's registration.

use crate::error::RegistrationError;
use crate::schema::validate_schema_budget;
use crate::types::{SharedHandler, ToolDeclaration};
use carapace_core::topic::is_valid_tool_name;
use carapace_core::GroupId;
use dashmap::DashMap;

struct Entry {
    declaration: ToolDeclaration,
    handler: SharedHandler,
}

/// Registry of every tool known to this daemon instance, built-in and
/// plugin-provided alike.
#[derive(Default)]
pub struct Catalog {
    entries: DashMap<String, Entry>,
}

impl Catalog {
    /// Construct an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self { entries: DashMap::new() }
    }

    /// Register a tool. Fails if the name is reserved, invalid, already
    /// registered, or the schema exceeds the complexity budget .
    pub fn register(        &self,
        declaration: ToolDeclaration,
        handler: SharedHandler,
) -> Result<(), RegistrationError> {
        if !is_valid_tool_name(&declaration.name) {
            return Err(RegistrationError::InvalidName(declaration.name));
        }
        if self.entries.contains_key(&declaration.name) {
            return Err(RegistrationError::DuplicateName(declaration.name));
        }
        if let Err(reason) = validate_schema_budget(&declaration.arguments_schema) {
            return Err(RegistrationError::SchemaRejected { name: declaration.name, reason });
        }

        tracing::debug!(tool = %declaration.name, risk = ?declaration.risk_level, "tool registered");
        self.entries.insert(declaration.name.clone(), Entry { declaration, handler });
        Ok(())
    }

    /// Whether a tool by this name is registered.
    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Fetch a tool's declaration and handler together.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<(ToolDeclaration, SharedHandler)> {
        self.entries.get(name).map(|e| (e.declaration.clone(), e.handler.clone()))
    }

    /// List every declaration visible to the given group ('s
    /// `list_tools` built-in and the authorise stage share this filter).
    #[must_use]
    pub fn list_by_group(&self, group: &GroupId) -> Vec<ToolDeclaration> {
        self.entries
            .iter()
            .map(|e| e.declaration.clone())
            .filter(|d| d.permits_group(group))
            .collect()
    }

    /// Remove a tool, e.g. when its owning plugin shuts down.
    pub fn unregister(&self, name: &str) -> bool {
        self.entries.remove(name).is_some()
    }

    /// Total number of registered tools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the catalog has no tools registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
