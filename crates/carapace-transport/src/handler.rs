//! The seam between the ROUTER socket and the request pipeline.

use crate::identity::ConnectionIdentity;
use async_trait::async_trait;
use carapace_core::envelope::Envelope;
use carapace_core::envelope::WireMessage;

/// Implemented by the request pipeline. The transport knows nothing
/// about sessions, catalogs, or dispatch — it only decodes frames and
/// hands them to this seam.
#[async_trait]
pub trait RequestHandler: Send + Sync {
    /// Handle one decoded wire message from the given connection.
    /// Returns `None` when the frame is correctly ignored rather than
    /// answered (spec  property 1: only frames lacking a non-empty
    /// `correlation` may go unanswered).
    async fn handle(&self, identity: ConnectionIdentity, wire: WireMessage) -> Option<Envelope>;

    /// Called when a connection's owning container is known to have
    /// gone away, so bound sessions can be torn down (`destroy`).
    async fn on_disconnect(&self, identity: ConnectionIdentity) {
        let _ = identity;
    }
}
