//! Session manager : a single lock guarding O(1) bind/lookup/destroy.

use crate::error::SessionError;
use crate::session::Session;
use carapace_core::GroupId;
use carapace_transport::ConnectionIdentity;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};

/// Default per-group session cap .
pub const DEFAULT_SESSION_CAP: usize = 3;

struct Inner {
    by_identity: HashMap<ConnectionIdentity, Session>,
    by_group: HashMap<GroupId, HashSet<ConnectionIdentity>>,
}

/// Binds ROUTER connection identities to sessions, enforcing the
/// per-group cap. All operations are serialised under a single lock;
/// every operation here is O(1).
pub struct SessionManager {
    inner: Mutex<Inner>,
    cap_per_group: usize,
}

impl SessionManager {
    /// Construct a manager with the default per-group cap.
    #[must_use]
    pub fn new() -> Self {
        Self::with_cap(DEFAULT_SESSION_CAP)
    }

    /// Construct a manager with an explicit per-group cap.
    #[must_use]
    pub fn with_cap(cap_per_group: usize) -> Self {
        Self {
            inner: Mutex::new(Inner { by_identity: HashMap::new(), by_group: HashMap::new() }),
            cap_per_group,
        }
    }

    /// On first frame from `identity`, bind it to a fresh session in
    /// `group` (enforcing the per-group cap). Subsequent calls for an
    /// already-bound identity return the existing session without
    /// re-checking the cap .
    pub fn bind_or_create_session(        &self,
        identity: ConnectionIdentity,
        group: GroupId,
) -> Result<Session, SessionError> {
        let mut inner = self.inner.lock();

        if let Some(existing) = inner.by_identity.get(&identity) {
            return Ok(existing.clone());
        }

        let members = inner.by_group.entry(group.clone()).or_default();
        if members.len() >= self.cap_per_group {
            return Err(SessionError::GroupAtCapacity {
                group: group.as_str().to_string(),
                count: members.len(),
                cap: self.cap_per_group,
            });
        }

        let session = Session::new(group.clone(), identity);
        inner.by_group.entry(group).or_default().insert(identity);
        inner.by_identity.insert(identity, session.clone());
        tracing::debug!(%identity, session_id = %session.session_id, "session bound");
        Ok(session)
    }

    /// Look up an already-bound session without creating one.
    #[must_use]
    pub fn lookup(&self, identity: ConnectionIdentity) -> Option<Session> {
        self.inner.lock().by_identity.get(&identity).cloned()
    }

    /// Tear down the session bound to `identity`, e.g. on container
    /// stop/death or idle expiry .
    pub fn destroy(&self, identity: ConnectionIdentity) -> Option<Session> {
        let mut inner = self.inner.lock();
        let session = inner.by_identity.remove(&identity)?;
        if let Some(members) = inner.by_group.get_mut(&session.group) {
            members.remove(&identity);
            if members.is_empty() {
                inner.by_group.remove(&session.group);
            }
        }
        tracing::debug!(%identity, session_id = %session.session_id, "session destroyed");
        Some(session)
    }

    /// Current number of live sessions for a group.
    #[must_use]
    pub fn group_session_count(&self, group: &GroupId) -> usize {
        self.inner.lock().by_group.get(group).map_or(0, HashSet::len)
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use carapace_transport::IdentityAllocator;

    fn identity(allocator: &IdentityAllocator) -> ConnectionIdentity {
        allocator.allocate()
    }

    #[test]
    fn binds_a_fresh_session() {
        let manager = SessionManager::new();
        let allocator = IdentityAllocator::new();
        let id = identity(&allocator);
        let session = manager.bind_or_create_session(id, GroupId::new("acme")).unwrap();
        assert_eq!(session.group, GroupId::new("acme"));
        assert_eq!(manager.group_session_count(&GroupId::new("acme")), 1);
    }

    #[test]
    fn reuses_session_for_same_identity_without_recheck() {
        let manager = SessionManager::with_cap(1);
        let allocator = IdentityAllocator::new();
        let id = identity(&allocator);
        let first = manager.bind_or_create_session(id, GroupId::new("acme")).unwrap();
        let second = manager.bind_or_create_session(id, GroupId::new("acme")).unwrap();
        assert_eq!(first.session_id, second.session_id);
    }

    #[test]
    fn enforces_per_group_cap() {
        let manager = SessionManager::with_cap(1);
        let allocator = IdentityAllocator::new();
        manager.bind_or_create_session(identity(&allocator), GroupId::new("acme")).unwrap();
        let err = manager.bind_or_create_session(identity(&allocator), GroupId::new("acme")).unwrap_err();
        assert!(matches!(err, SessionError::GroupAtCapacity { .. }));
    }

    #[test]
    fn destroy_frees_a_capacity_slot() {
        let manager = SessionManager::with_cap(1);
        let allocator = IdentityAllocator::new();
        let first = identity(&allocator);
        manager.bind_or_create_session(first, GroupId::new("acme")).unwrap();
        manager.destroy(first);
        assert_eq!(manager.group_session_count(&GroupId::new("acme")), 0);
        let second = identity(&allocator);
        assert!(manager.bind_or_create_session(second, GroupId::new("acme")).is_ok());
    }

    #[test]
    fn different_groups_have_independent_caps() {
        let manager = SessionManager::with_cap(1);
        let allocator = IdentityAllocator::new();
        manager.bind_or_create_session(identity(&allocator), GroupId::new("acme")).unwrap();
        assert!(manager.bind_or_create_session(identity(&allocator), GroupId::new("other")).is_ok());
    }
}
