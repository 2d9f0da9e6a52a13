//! Tool declarations and the handler seam tools are dispatched through.

use async_trait::async_trait;
use carapace_core::{CorrelationId, GroupId, RiskLevel, SessionId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// A tool as registered in the catalog ("Tool declaration").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDeclaration {
    /// Unique tool name, matched against `topic.invoke.<name>`.
    pub name: String,
    /// Human-readable description surfaced to callers.
    pub description: String,
    /// Risk tier; `Medium`/`High` require confirmation .
    pub risk_level: RiskLevel,
    /// JSON-Schema-subset describing the call's `arguments` object.
    pub arguments_schema: Value,
    /// Groups permitted to invoke this tool. `None` means every group.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_groups: Option<Vec<String>>,
}

impl ToolDeclaration {
    /// Whether the given group may invoke this tool (stage 4 "authorise").
    #[must_use]
    pub fn permits_group(&self, group: &GroupId) -> bool {
        match &self.allowed_groups {
            None => true,
            Some(groups) => groups.iter().any(|g| g == group.as_str()),
        }
    }
}

/// Context passed to a [`ToolHandler`] for a single call.
#[derive(Debug, Clone)]
pub struct ToolContext {
    /// Session the call originated from.
    pub session_id: SessionId,
    /// Group the session belongs to.
    pub group: GroupId,
    /// Correlation id to thread through any resulting events.
    pub correlation: Option<CorrelationId>,
}

/// Ways a handler can fail a call (maps onto the stage-6 `ErrorCode`s:
/// `PLUGIN_TIMEOUT`, `PLUGIN_UNAVAILABLE`, `PLUGIN_ERROR`, `HANDLER_ERROR`).
#[derive(Debug, Clone)]
pub enum HandlerFailure {
    /// The handler did not respond within its bounded timeout.
    Timeout,
    /// The handler (plugin process) is not currently available.
    Unavailable(String),
    /// The handler ran but reported an application-level error.
    PluginError(String),
    /// An in-process handler panicked or returned an unexpected error.
    HandlerError(String),
}

/// A dispatchable tool implementation. Built-in tools and plugin-backed
/// tools both implement this the same way; the pipeline does not know
/// the difference (dispatch).
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Execute the call and return its JSON result, or a categorised failure.
    async fn call(&self, ctx: ToolContext, arguments: Value) -> Result<Value, HandlerFailure>;
}

/// Shared handle to a registered handler.
pub type SharedHandler = Arc<dyn ToolHandler>;
