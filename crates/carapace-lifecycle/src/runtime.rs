//! Container runtime abstraction : one trait, two concrete flavors
//! (`docker`, `podman`), absorbing per-runtime quirks behind a single
//! surface so the lifecycle manager never branches on which binary is in
//! use.

use crate::error::RuntimeError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;

/// Which container engine a [`ContainerRuntime`] talks to. Read once at
/// construction; per-runtime quirks (SELinux relabeling for Podman,
/// health-field naming differences) are absorbed inside the
/// implementation rather than branched on at every call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeFlavor {
    /// `docker`.
    Docker,
    /// `podman`.
    Podman,
}

impl RuntimeFlavor {
    /// The binary name this flavor shells out to.
    #[must_use]
    pub fn binary(self) -> &'static str {
        match self {
            Self::Docker => "docker",
            Self::Podman => "podman",
        }
    }
}

/// A bind mount from a host path into the container.
#[derive(Debug, Clone)]
pub struct BindMount {
    /// Path on the host.
    pub host_path: PathBuf,
    /// Path inside the container.
    pub container_path: PathBuf,
    /// Mounted read-only.
    pub read_only: bool,
}

/// Everything needed to start one container for one session .
#[derive(Debug, Clone)]
pub struct ContainerSpec {
    /// Image reference to run.
    pub image: String,
    /// Bind mounts (the two sockets, plus any plugin-declared extras).
    pub mounts: Vec<BindMount>,
    /// Environment variables passed into the container (`sessionId`,
    /// `group`, resume token if present).
    pub env: HashMap<String, String>,
    /// Whether the root filesystem is mounted read-only.
    pub read_only_rootfs: bool,
    /// Whether networking is enabled (only true when an allowlist applies).
    pub network_enabled: bool,
    /// Non-root user to run as, e.g. `"1000:1000"`.
    pub user: String,
    /// Linux capabilities to drop. An explicit `"ALL"` drops everything.
    pub drop_capabilities: Vec<String>,
    /// Size, in bytes, of the writable ephemeral tmpfs mounted for
    /// scratch space.
    pub tmpfs_size_bytes: u64,
    /// Labels applied to the container so `inspect_labels` can recover
    /// `sessionId`/`group` without a side table.
    pub labels: HashMap<String, String>,
}

/// Lifecycle state reported by [`ContainerRuntime::inspect`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerState {
    /// Created but not yet started.
    Created,
    /// Currently running.
    Running,
    /// Exited cleanly or otherwise, not yet removed.
    Exited,
    /// Runtime reports the container as dead (Podman's status, not used
    /// by Docker).
    Dead,
    /// Status the runtime reported that this abstraction does not model.
    Unknown,
}

/// The snapshot returned by `inspect`.
#[derive(Debug, Clone)]
pub struct ContainerInspection {
    /// Current lifecycle state.
    pub state: ContainerState,
    /// Process exit code, once exited.
    pub exit_code: Option<i32>,
}

/// Runtime abstraction : implemented once per engine. Every method
/// that shells out is expected to apply its own timeout internally.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Whether the configured binary is present and responds at all.
    async fn is_available(&self) -> bool;

    /// The runtime's reported version string.
    async fn version(&self) -> Result<String, RuntimeError>;

    /// Pull `image` if not already present locally.
    async fn pull(&self, image: &str) -> Result<(), RuntimeError>;

    /// Whether `image` already exists locally.
    async fn image_exists(&self, image: &str) -> Result<bool, RuntimeError>;

    /// Build an image from a context directory (used by plugin bundles
    /// that ship a Dockerfile rather than a prebuilt reference).
    async fn build(&self, context_dir: &std::path::Path, tag: &str) -> Result<(), RuntimeError>;

    /// Read back the labels a container was started with.
    async fn inspect_labels(&self, container_id: &str) -> Result<HashMap<String, String>, RuntimeError>;

    /// Start a container per `spec`, returning the runtime's container id.
    async fn run(&self, spec: &ContainerSpec) -> Result<String, RuntimeError>;

    /// Ask a container to stop, waiting up to `timeout` for a clean exit.
    async fn stop(&self, container_id: &str, timeout: std::time::Duration) -> Result<(), RuntimeError>;

    /// Send `SIGKILL` (or the runtime's equivalent) immediately.
    async fn kill(&self, container_id: &str) -> Result<(), RuntimeError>;

    /// Remove a stopped container.
    async fn remove(&self, container_id: &str) -> Result<(), RuntimeError>;

    /// Current lifecycle state and exit code, if any.
    async fn inspect(&self, container_id: &str) -> Result<ContainerInspection, RuntimeError>;
}
