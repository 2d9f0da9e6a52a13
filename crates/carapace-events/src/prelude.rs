//! Convenience re-exports.

pub use crate::bus::{EventBus, EventReceiver};
pub use crate::event::CarapaceEvent;
