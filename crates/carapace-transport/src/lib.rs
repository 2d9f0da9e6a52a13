//! Carapace Transport — the ROUTER request socket and PUB event socket
//! over Unix domain sockets, plus the shared framing and per-connection
//! identity they're built on.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]

pub mod error;
pub mod frame;
pub mod handler;
pub mod identity;
pub mod paths;
pub mod prelude;
pub mod pub_socket;
pub mod router;

pub use error::TransportError;
pub use frame::{read_frame, write_frame, FrameError, MAX_FRAME_BYTES};
pub use handler::RequestHandler;
pub use identity::{ConnectionIdentity, IdentityAllocator};
pub use pub_socket::PubServer;
pub use router::RouterServer;
