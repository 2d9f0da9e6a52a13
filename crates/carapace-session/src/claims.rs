//! Session claim registry.
//!
//!  has the lifecycle manager pass each spawned container's
//! assigned `sessionId` and `group` in via environment variables
//! before the container ever speaks on the shared ROUTER socket. A
//! container redeems that assignment on its first frame — the
//! `get_session_info` builtin — by presenting the claim token it was
//! given; the pipeline resolves it to a group and only then binds the
//! ROUTER connection's identity to a session.

use carapace_core::GroupId;
use dashmap::DashMap;

/// Maps a one-time claim token (the env-supplied session claim) to the
/// group it authorises.
#[derive(Default)]
pub struct ClaimRegistry {
    claims: DashMap<String, GroupId>,
}

impl ClaimRegistry {
    /// Construct an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a claim token for a container the lifecycle manager is
    /// about to spawn.
    pub fn register(&self, claim: impl Into<String>, group: GroupId) {
        self.claims.insert(claim.into(), group);
    }

    /// Redeem a claim token, consuming it. Returns `None` for an
    /// unknown or already-redeemed token.
    pub fn resolve(&self, claim: &str) -> Option<GroupId> {
        self.claims.remove(claim).map(|(_, group)| group)
    }
}
