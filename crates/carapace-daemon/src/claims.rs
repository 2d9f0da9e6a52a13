//! Adapts `carapace-session`'s claim registry to the narrow callback
//! seam `carapace-lifecycle` spawns containers through, so neither
//! crate needs to depend on the other.

use carapace_core::{GroupId, SessionId};
use carapace_lifecycle::SessionClaimSink;
use carapace_session::ClaimRegistry;
use std::sync::Arc;

/// Forwards lifecycle's per-spawn claim registration into the session
/// crate's claim registry, keyed by the session id's string form (the
/// same claim token a container presents back via
/// `tool.invoke.get_session_info`).
pub struct ClaimSinkAdapter(pub Arc<ClaimRegistry>);

impl SessionClaimSink for ClaimSinkAdapter {
    fn register(&self, session_id: SessionId, group: &GroupId) {
        self.0.register(session_id.to_string(), group.clone());
    }
}
