//! Carapace Lifecycle — the container runtime abstraction and the
//! lifecycle manager: spawn on trigger, per-group running cap, crash
//! detection, and graceful shutdown .

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]

pub mod error;
pub mod manager;
pub mod prelude;
pub mod runtime;
pub mod subprocess;

pub use error::{LifecycleError, RuntimeError};
pub use manager::{
    GroupSpawnConfig, LifecycleConfig, LifecycleManager, SessionClaimSink, DEFAULT_CRASH_POLL_INTERVAL,
    DEFAULT_SPAWN_QUEUE_CAP, DEFAULT_STOP_GRACE,
};
pub use runtime::{BindMount, ContainerInspection, ContainerRuntime, ContainerSpec, ContainerState, RuntimeFlavor};
pub use subprocess::SubprocessRuntime;
