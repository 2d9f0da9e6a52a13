//! Convenience re-exports.

pub use crate::error::TransportError;
pub use crate::handler::RequestHandler;
pub use crate::identity::ConnectionIdentity;
pub use crate::pub_socket::PubServer;
pub use crate::router::RouterServer;
