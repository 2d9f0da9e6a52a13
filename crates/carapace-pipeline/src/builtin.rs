//! The three reserved topics the pipeline answers itself rather than
//! dispatching through the catalog ('s reserved-name list).
//!
//! `get_session_info` is handled directly in [`crate::pipeline`] because
//! answering it is what establishes the session in the first place;
//! these two are ordinary read-only queries over already-bound state.

use carapace_catalog::Catalog;
use carapace_confirm::ConfirmationGate;
use carapace_core::GroupId;
use carapace_ratelimit::RateLimiter;
use serde_json::{json, Value};

/// `list_tools`: every declaration visible to the caller's group (/// stage 2's own special case, listed alongside the catalog it mirrors).
#[must_use]
pub fn list_tools(catalog: &Catalog, group: &GroupId) -> Value {
    let tools: Vec<Value> = catalog
        .list_by_group(group)
        .into_iter()
        .map(|decl| {
            json!({
                "name": decl.name,
                "description": decl.description,
                "risk_level": decl.risk_level,
                "arguments_schema": decl.arguments_schema,
            })
        })
        .collect();
    json!({ "tools": tools })
}

/// `get_diagnostics`: a point-in-time snapshot of internal pipeline
/// state, useful for operator troubleshooting. Carries no tool
/// arguments or results, only structural counts.
#[must_use]
pub fn get_diagnostics(catalog: &Catalog, gate: &ConfirmationGate, limiter: &RateLimiter) -> Value {
    json!({
        "tools_registered": catalog.len(),
        "pending_confirmations": gate.pending_count(),
        "rate_limit_buckets": limiter.bucket_count(),
    })
}
