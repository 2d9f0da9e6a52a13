//! Failures from the runtime abstraction and the lifecycle manager.

use thiserror::Error;

/// Failures surfaced by a [`crate::runtime::ContainerRuntime`] implementation.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// The configured runtime binary is not on `PATH` or failed to respond
    /// to `isAvailable`/`version`.
    #[error("container runtime unavailable: {0}")]
    Unavailable(String),
    /// The runtime command exited non-zero.
    #[error("runtime command `{command}` failed (exit {exit_code:?}): {stderr}")]
    CommandFailed {
        /// The subcommand that failed, e.g. `"run"`.
        command: &'static str,
        /// Process exit code, if the process actually exited.
        exit_code: Option<i32>,
        /// Captured stderr.
        stderr: String,
    },
    /// The runtime command did not complete within its timeout.
    #[error("runtime command `{0}` timed out")]
    Timeout(&'static str),
    /// The runtime's output could not be parsed as expected (e.g. labels,
    /// `inspect` JSON).
    #[error("failed to parse runtime output for `{command}`: {message}")]
    MalformedOutput {
        /// The subcommand whose output failed to parse.
        command: &'static str,
        /// Parse failure detail.
        message: String,
    },
    /// Spawning the subprocess itself failed (binary missing, permissions).
    #[error("failed to spawn runtime process: {0}")]
    Spawn(String),
}

/// Failures from the lifecycle manager itself, distinct from runtime
/// command failures.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// Delegated runtime failure.
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
    /// The resume-token store could not be read or written.
    #[error("resume-token store error: {0}")]
    Store(#[from] carapace_audit::AuditError),
    /// The group named in a trigger event has no configured spawn policy.
    #[error("group '{0}' is not configured for container spawning")]
    UnconfiguredGroup(String),
}
