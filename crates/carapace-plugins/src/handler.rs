//! The plugin-side handler seam: one handler per bundle, dispatching by
//! tool name, adapted into the catalog's one-handler-per-tool
//! [`carapace_catalog::ToolHandler`] at registration time.

use async_trait::async_trait;
use carapace_catalog::{HandlerFailure, ToolContext, ToolHandler};
use serde_json::Value;
use std::sync::Arc;

/// Host-provided collaborators a plugin's `initialize` may need. Kept
/// deliberately small: concrete tool behaviour is an external
/// collaborator's concern, not the loader's.
#[derive(Debug, Clone)]
pub struct PluginServices {
    /// The plugin's own name, as declared in its manifest.
    pub plugin_name: String,
}

/// A plugin bundle's single entry point, covering every tool its
/// manifest declares.
#[async_trait]
pub trait PluginHandler: Send + Sync {
    /// Called once at load time, before any tool call is dispatched.
    async fn initialize(&self, services: PluginServices) -> Result<(), String>;

    /// Dispatch a call for `tool_name` (one of the names this bundle's
    /// manifest declared).
    async fn call(&self, tool_name: &str, ctx: ToolContext, arguments: Value) -> Result<Value, HandlerFailure>;

    /// Called once at shutdown, best-effort under a deadline.
    async fn shutdown(&self);
}

/// Adapts one tool of a [`PluginHandler`] bundle into the catalog's
/// per-tool [`ToolHandler`] seam.
pub struct PluginToolHandler {
    plugin: Arc<dyn PluginHandler>,
    tool_name: String,
}

impl PluginToolHandler {
    /// Build an adapter forwarding calls for `tool_name` to `plugin`.
    #[must_use]
    pub fn new(plugin: Arc<dyn PluginHandler>, tool_name: impl Into<String>) -> Self {
        Self { plugin, tool_name: tool_name.into() }
    }
}

#[async_trait]
impl ToolHandler for PluginToolHandler {
    async fn call(&self, ctx: ToolContext, arguments: Value) -> Result<Value, HandlerFailure> {
        self.plugin.call(&self.tool_name, ctx, arguments).await
    }
}
