//! [`ContainerRuntime`] implemented by shelling out to a configured
//! container engine binary ("Runtime abstraction").
//!
//! Mirrors the teacher's `CommandHandler`: environment allowlisting,
//! piped stdio, and a [`tokio::time::timeout`] wrapped around
//! `wait_with_output` rather than a raw `Command::output`.

use crate::error::RuntimeError;
use crate::runtime::{BindMount, ContainerInspection, ContainerRuntime, ContainerSpec, ContainerState, RuntimeFlavor};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Upper bound on how long any single runtime command is allowed to run
/// before it is treated as a [`RuntimeError::Timeout`].
const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

/// Environment variables safe to inherit from the daemon's own process
/// when shelling out to the runtime binary.
const ALLOWED_ENV_VARS: &[&str] = &["PATH", "HOME", "XDG_RUNTIME_DIR", "DOCKER_HOST", "CONTAINER_HOST"];

/// Shells out to `docker` or `podman` for every [`ContainerRuntime`]
/// operation.
#[derive(Debug, Clone)]
pub struct SubprocessRuntime {
    flavor: RuntimeFlavor,
    command_timeout: Duration,
}

impl SubprocessRuntime {
    /// Build a runtime that talks to `flavor`'s binary with the default
    /// per-command timeout.
    #[must_use]
    pub fn new(flavor: RuntimeFlavor) -> Self {
        Self { flavor, command_timeout: DEFAULT_COMMAND_TIMEOUT }
    }

    /// Override the per-command timeout.
    #[must_use]
    pub fn with_timeout(flavor: RuntimeFlavor, command_timeout: Duration) -> Self {
        Self { flavor, command_timeout }
    }

    fn base_command(&self) -> Command {
        let mut cmd = Command::new(self.flavor.binary());
        cmd.env_clear();
        for var in ALLOWED_ENV_VARS {
            if let Ok(value) = std::env::var(var) {
                cmd.env(var, value);
            }
        }
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd
    }

    async fn run_command(&self, label: &'static str, mut cmd: Command) -> Result<String, RuntimeError> {
        let output = match timeout(self.command_timeout, async {
            let child = cmd.spawn().map_err(|e| RuntimeError::Spawn(e.to_string()))?;
            child.wait_with_output().await.map_err(|e| RuntimeError::Spawn(e.to_string()))
        })
        .await
        {
            Ok(result) => result?,
            Err(_) => return Err(RuntimeError::Timeout(label)),
        };

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            warn!(command = label, exit_code = ?output.status.code(), %stderr, "runtime command failed");
            return Err(RuntimeError::CommandFailed {
                command: label,
                exit_code: output.status.code(),
                stderr,
            });
        }

        Ok(stdout)
    }

    fn spec_args(spec: &ContainerSpec) -> Vec<String> {
        let mut args = vec!["run".to_string(), "-d".to_string()];

        if spec.read_only_rootfs {
            args.push("--read-only".to_string());
        }
        if !spec.network_enabled {
            args.push("--network".to_string());
            args.push("none".to_string());
        }
        if !spec.user.is_empty() {
            args.push("--user".to_string());
            args.push(spec.user.clone());
        }
        for cap in &spec.drop_capabilities {
            args.push("--cap-drop".to_string());
            args.push(cap.clone());
        }
        if spec.tmpfs_size_bytes > 0 {
            args.push("--tmpfs".to_string());
            args.push(format!("/tmp:rw,size={}", spec.tmpfs_size_bytes));
        }
        for mount in &spec.mounts {
            args.push("-v".to_string());
            args.push(format!(                "{}:{}:{}",
                mount.host_path.display(),
                mount.container_path.display(),
                if mount.read_only { "ro" } else { "rw" }
));
        }
        for (key, value) in &spec.env {
            args.push("-e".to_string());
            args.push(format!("{key}={value}"));
        }
        for (key, value) in &spec.labels {
            args.push("--label".to_string());
            args.push(format!("{key}={value}"));
        }
        args.push(spec.image.clone());
        args
    }
}

#[derive(Deserialize)]
struct InspectState {
    #[serde(rename = "Status")]
    status: String,
    #[serde(rename = "ExitCode")]
    exit_code: Option<i32>,
}

#[derive(Deserialize)]
struct InspectEntry {
    #[serde(rename = "State")]
    state: InspectState,
    #[serde(rename = "Config")]
    config: InspectConfig,
}

#[derive(Deserialize)]
struct InspectConfig {
    #[serde(rename = "Labels", default)]
    labels: HashMap<String, String>,
}

#[async_trait]
impl ContainerRuntime for SubprocessRuntime {
    async fn is_available(&self) -> bool {
        self.version().await.is_ok()
    }

    async fn version(&self) -> Result<String, RuntimeError> {
        let mut cmd = self.base_command();
        cmd.arg("version").arg("--format").arg("{{.Server.Version}}");
        self.run_command("version", cmd).await
    }

    async fn pull(&self, image: &str) -> Result<(), RuntimeError> {
        let mut cmd = self.base_command();
        cmd.arg("pull").arg(image);
        self.run_command("pull", cmd).await.map(drop)
    }

    async fn image_exists(&self, image: &str) -> Result<bool, RuntimeError> {
        let mut cmd = self.base_command();
        cmd.arg("image").arg("inspect").arg(image);
        match self.run_command("image_exists", cmd).await {
            Ok(_) => Ok(true),
            Err(RuntimeError::CommandFailed { .. }) => Ok(false),
            Err(other) => Err(other),
        }
    }

    async fn build(&self, context_dir: &Path, tag: &str) -> Result<(), RuntimeError> {
        let mut cmd = self.base_command();
        cmd.arg("build").arg("-t").arg(tag).arg(context_dir);
        self.run_command("build", cmd).await.map(drop)
    }

    async fn inspect_labels(&self, container_id: &str) -> Result<HashMap<String, String>, RuntimeError> {
        let mut cmd = self.base_command();
        cmd.arg("inspect").arg(container_id);
        let stdout = self.run_command("inspect_labels", cmd).await?;
        let entries: Vec<InspectEntry> = serde_json::from_str(&stdout).map_err(|e| RuntimeError::MalformedOutput {
            command: "inspect_labels",
            message: e.to_string(),
        })?;
        let entry = entries.into_iter().next().ok_or_else(|| RuntimeError::MalformedOutput {
            command: "inspect_labels",
            message: "empty inspect array".to_string(),
        })?;
        Ok(entry.config.labels)
    }

    async fn run(&self, spec: &ContainerSpec) -> Result<String, RuntimeError> {
        let mut cmd = self.base_command();
        cmd.args(Self::spec_args(spec));
        let stdout = self.run_command("run", cmd).await?;
        let container_id = stdout.trim().to_string();
        debug!(container_id = %container_id, image = %spec.image, "container started");
        Ok(container_id)
    }

    async fn stop(&self, container_id: &str, timeout: Duration) -> Result<(), RuntimeError> {
        let mut cmd = self.base_command();
        cmd.arg("stop").arg("--time").arg(timeout.as_secs().to_string()).arg(container_id);
        self.run_command("stop", cmd).await.map(drop)
    }

    async fn kill(&self, container_id: &str) -> Result<(), RuntimeError> {
        let mut cmd = self.base_command();
        cmd.arg("kill").arg(container_id);
        self.run_command("kill", cmd).await.map(drop)
    }

    async fn remove(&self, container_id: &str) -> Result<(), RuntimeError> {
        let mut cmd = self.base_command();
        cmd.arg("rm").arg("-f").arg(container_id);
        self.run_command("remove", cmd).await.map(drop)
    }

    async fn inspect(&self, container_id: &str) -> Result<ContainerInspection, RuntimeError> {
        let mut cmd = self.base_command();
        cmd.arg("inspect").arg(container_id);
        let stdout = self.run_command("inspect", cmd).await?;
        let entries: Vec<InspectEntry> = serde_json::from_str(&stdout).map_err(|e| RuntimeError::MalformedOutput {
            command: "inspect",
            message: e.to_string(),
        })?;
        let entry = entries.into_iter().next().ok_or_else(|| RuntimeError::MalformedOutput {
            command: "inspect",
            message: "empty inspect array".to_string(),
        })?;
        let state = match entry.state.status.as_str() {
            "created" => ContainerState::Created,
            "running" => ContainerState::Running,
            "exited" => ContainerState::Exited,
            "dead" => ContainerState::Dead,
            _ => ContainerState::Unknown,
        };
        Ok(ContainerInspection { state, exit_code: entry.state.exit_code })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn sample_spec() -> ContainerSpec {
        ContainerSpec {
            image: "carapace/agent:latest".to_string(),
            mounts: vec![BindMount {
                host_path: PathBuf::from("/home/carapace/run/sockets"),
                container_path: PathBuf::from("/run/carapace"),
                read_only: false,
            }],
            env: HashMap::from([("sessionId".to_string(), "abc".to_string())]),
            read_only_rootfs: true,
            network_enabled: false,
            user: "1000:1000".to_string(),
            drop_capabilities: vec!["ALL".to_string()],
            tmpfs_size_bytes: 64 * 1024 * 1024,
            labels: HashMap::from([("carapace.group".to_string(), "acme".to_string())]),
        }
    }

    #[test]
    fn spec_args_include_security_hardening() {
        let args = SubprocessRuntime::spec_args(&sample_spec());
        assert!(args.contains(&"--read-only".to_string()));
        assert!(args.contains(&"none".to_string()));
        assert!(args.contains(&"ALL".to_string()));
        assert!(args.iter().any(|a| a.starts_with("/tmp:rw,size=")));
        assert_eq!(args.last().unwrap(), "carapace/agent:latest");
    }

    #[test]
    fn runtime_flavor_picks_correct_binary() {
        let docker = SubprocessRuntime::new(RuntimeFlavor::Docker);
        let podman = SubprocessRuntime::new(RuntimeFlavor::Podman);
        assert_eq!(docker.flavor.binary(), "docker");
        assert_eq!(podman.flavor.binary(), "podman");
    }

    #[tokio::test]
    async fn unavailable_binary_reports_not_available() {
        let runtime = SubprocessRuntime::new(RuntimeFlavor::Docker);
        // In a sandboxed test environment without a container engine this
        // should fail gracefully rather than panic.
        let _ = runtime.is_available().await;
    }
}
