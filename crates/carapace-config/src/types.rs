//! The typed shape of a carapace daemon's configuration (`spec.md`).
//!
//! Every field here is self-contained and `serde`-derives `Default` (or
//! provides one) so that a bare `[section]` header — or no file at all —
//! produces a working configuration, mirroring the teacher's convention
//! in `astrid-config::types`.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration consumed by `carapace-daemon`.
///
/// Loading this struct from disk is an external-collaborator concern
/// (`spec.md`); this crate only owns the struct's shape, its
/// defaults, and the validation that makes a parsed value usable.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CarapaceConfig {
    /// Root directory carapace reads and writes under
    /// (`<home>/run`, `<home>/data`, `<home>/credentials`).
    pub home: PathBuf,
    /// `tracing-subscriber` `EnvFilter` directive, e.g. `"info"` or
    /// `"carapace_pipeline=debug,info"`.
    pub log_level: String,
    /// Emit JSON-formatted log lines instead of compact text.
    pub log_json: bool,
    /// Per-group session cap (`spec.md`).
    pub session_cap_per_group: usize,
    /// Dispatch timeout for pipeline stage 6, in seconds (`spec.md`).
    pub handler_timeout_secs: u64,
    /// Confirmation-gate timeout, in seconds (`spec.md`).
    pub confirmation_timeout_secs: u64,
    /// Default rate-limit settings applied to every `(session, tool)`
    /// bucket (`spec.md`).
    pub rate_limit: RateLimitSettings,
    /// Directories walked for `plugin.toml` bundles (`spec.md`).
    pub plugin_roots: Vec<PathBuf>,
    /// Container runtime settings (`spec.md`).
    pub container: ContainerSettings,
    /// Per-group container spawn policy, keyed by group name. A group
    /// with no entry here cannot trigger a container spawn.
    pub groups: HashMap<String, GroupSettings>,
    /// Defense-in-depth output sanitiser settings (`spec.md`).
    pub sanitizer: SanitizerSettings,
}

impl Default for CarapaceConfig {
    fn default() -> Self {
        Self {
            home: PathBuf::from("/var/lib/carapace"),
            log_level: "info".to_string(),
            log_json: false,
            session_cap_per_group: 3,
            handler_timeout_secs: 30,
            confirmation_timeout_secs: 5 * 60,
            rate_limit: RateLimitSettings::default(),
            plugin_roots: Vec::new(),
            container: ContainerSettings::default(),
            groups: HashMap::new(),
            sanitizer: SanitizerSettings::default(),
        }
    }
}

/// Token-bucket defaults (`spec.md`). Per-tool overrides are not
/// modeled here — every `(session, tool)` bucket starts from these
/// unless a future revision of the protocol adds per-tool overrides.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitSettings {
    /// Sustained rate, requests per minute.
    pub requests_per_minute: u32,
    /// Maximum instantaneous burst.
    pub burst_size: u32,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self { requests_per_minute: 60, burst_size: 10 }
    }
}

/// Which container engine to shell out to, and the global timing knobs
/// around spawning/supervising containers (`spec.md`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerSettings {
    /// `"docker"` or `"podman"`.
    pub runtime: String,
    /// Default image reference used by a group with no `image` override.
    pub default_image: String,
    /// Interval between crash-detection `inspect` sweeps, in seconds.
    pub crash_poll_interval_secs: u64,
    /// Grace period before a `stop` is escalated to `kill`, in seconds.
    pub stop_grace_secs: u64,
    /// Queue depth per group before the oldest queued trigger is shed.
    pub spawn_queue_cap: usize,
    /// Path the two sockets are bind-mounted to inside every container.
    pub container_socket_dir: PathBuf,
}

impl Default for ContainerSettings {
    fn default() -> Self {
        Self {
            runtime: "docker".to_string(),
            default_image: "carapace/agent:latest".to_string(),
            crash_poll_interval_secs: 5,
            stop_grace_secs: 10,
            spawn_queue_cap: 16,
            container_socket_dir: PathBuf::from("/run/carapace"),
        }
    }
}

/// Per-group container spawn policy (`spec.md`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupSettings {
    /// Image reference for this group; falls back to
    /// [`ContainerSettings::default_image`] when empty.
    pub image: String,
    /// Maximum concurrently running containers for this group.
    pub cap: usize,
    /// Network allowlist entries; an empty list means no network.
    pub network_allowlist: Vec<String>,
    /// Non-root user the container runs as, e.g. `"1000:1000"`.
    pub user: String,
    /// Capabilities to drop; `["ALL"]` drops everything.
    pub drop_capabilities: Vec<String>,
    /// Writable ephemeral tmpfs size, in bytes.
    pub tmpfs_size_bytes: u64,
}

impl Default for GroupSettings {
    fn default() -> Self {
        Self {
            image: String::new(),
            cap: 1,
            network_allowlist: Vec::new(),
            user: "1000:1000".to_string(),
            drop_capabilities: vec!["ALL".to_string()],
            tmpfs_size_bytes: 64 * 1024 * 1024,
        }
    }
}

/// Output-sanitiser settings. The credential-pattern inventory is
/// treated as security-critical configuration per `spec.md` 's open
/// question: it is always a caller-supplied list rather than a
/// hard-coded constant, with the crate's own defaults used when the
/// list is empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SanitizerSettings {
    /// Whether the defense-in-depth sanitiser runs at all.
    pub enabled: bool,
    /// Additional redaction patterns, appended to the built-in
    /// inventory. Empty by default — the built-ins alone are usually
    /// sufficient; this exists for deployments with their own
    /// vendor-specific credential shapes.
    pub extra_patterns: Vec<SanitizePatternSettings>,
}

/// One caller-supplied redaction rule (`spec.md`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SanitizePatternSettings {
    /// Name for diagnostics.
    pub name: String,
    /// Regex pattern. Must be anchored and free of nested quantifiers —
    /// enforced at validation time, not merely documented (`spec.md`
    /// 's "no pattern flags that admit catastrophic backtracking"
    /// applies equally here).
    pub pattern: String,
    /// Replacement template passed to `Regex::replace_all`.
    #[serde(default = "default_replacement")]
    pub replacement: String,
}

fn default_replacement() -> String {
    "[REDACTED]".to_string()
}
