//! Carapace Events — the internal broadcast bus shared by the pipeline,
//! the lifecycle manager, container output readers, and the PUB socket.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]

pub mod bus;
pub mod event;
pub mod prelude;
pub mod subscriber;

pub use bus::{EventBus, EventReceiver, DEFAULT_CHANNEL_CAPACITY};
pub use event::CarapaceEvent;
pub use subscriber::{Listener, SubscriberRegistry};
