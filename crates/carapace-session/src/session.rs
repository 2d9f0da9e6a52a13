//! A bound session ("Session").

use carapace_core::{GroupId, SessionId, Timestamp};
use carapace_transport::ConnectionIdentity;

/// `(sessionId, group, containerId, connectionIdentity, startedAt)`, as
/// named by . Created when a container first speaks on the ROUTER and
/// authenticates; destroyed on container stop or idle expiry.
#[derive(Debug, Clone)]
pub struct Session {
    /// Fresh identifier assigned at bind time.
    pub session_id: SessionId,
    /// Authorisation namespace this session belongs to.
    pub group: GroupId,
    /// The container this session is bound to, once known.
    pub container_id: Option<String>,
    /// The ROUTER connection this session answers on.
    pub connection: ConnectionIdentity,
    /// When the session was created.
    pub started_at: Timestamp,
}

impl Session {
    pub(crate) fn new(group: GroupId, connection: ConnectionIdentity) -> Self {
        Self {
            session_id: SessionId::new(),
            group,
            container_id: None,
            connection,
            started_at: Timestamp::now(),
        }
    }
}
