//! Convenience re-exports.

pub use crate::error::{LifecycleError, RuntimeError};
pub use crate::manager::{GroupSpawnConfig, LifecycleConfig, LifecycleManager, SessionClaimSink};
pub use crate::runtime::{ContainerRuntime, ContainerSpec, RuntimeFlavor};
pub use crate::subprocess::SubprocessRuntime;
