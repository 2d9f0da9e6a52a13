//! The lifecycle manager : spawns containers on trigger, caps
//! concurrent containers per group, polls for crashes, and drains
//! everything on shutdown.

use crate::error::LifecycleError;
use crate::runtime::{BindMount, ContainerRuntime, ContainerSpec, ContainerState};
use carapace_audit::resume::ResumeTokenStore;
use carapace_core::{GroupId, SessionId, Topic};
use carapace_events::{CarapaceEvent, EventBus};
use serde_json::json;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{info, warn};

/// Default interval between crash-detection `inspect` sweeps (NEW).
pub const DEFAULT_CRASH_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Default grace period given to a container's own shutdown before it
/// is force-killed.
pub const DEFAULT_STOP_GRACE: Duration = Duration::from_secs(10);

/// Default bound on queued spawn triggers per group before the oldest
/// is shed (backpressure).
pub const DEFAULT_SPAWN_QUEUE_CAP: usize = 16;

/// Per-group policy for container spawning.
#[derive(Debug, Clone)]
pub struct GroupSpawnConfig {
    /// Image reference to run for this group.
    pub image: String,
    /// Maximum concurrently running containers for this group.
    pub cap: usize,
    /// Bind mounts applied to every container spawned for this group
    /// (the two sockets are always included by the manager in addition
    /// to these).
    pub extra_mounts: Vec<BindMount>,
    /// Whether outbound networking is enabled (only true when an
    /// allowlist applies).
    pub network_enabled: bool,
    /// Non-root user the container runs as.
    pub user: String,
    /// Capabilities to drop; `["ALL"]` drops everything.
    pub drop_capabilities: Vec<String>,
    /// Writable ephemeral tmpfs size, in bytes.
    pub tmpfs_size_bytes: u64,
}

/// Global configuration for the manager, independent of any one group.
#[derive(Debug, Clone)]
pub struct LifecycleConfig {
    /// Host path of the ROUTER socket, bind-mounted read-write into
    /// every container.
    pub requests_socket: std::path::PathBuf,
    /// Host path of the PUB socket, bind-mounted read-only into every
    /// container.
    pub events_socket: std::path::PathBuf,
    /// Container-side path the sockets are mounted at.
    pub container_socket_dir: std::path::PathBuf,
    /// Interval between crash-detection sweeps.
    pub crash_poll_interval: Duration,
    /// Grace period before escalating `stop` to `kill`.
    pub stop_grace: Duration,
    /// Queue depth per group before oldest-shed kicks in.
    pub spawn_queue_cap: usize,
}

/// Callback the manager uses to hand a freshly minted [`SessionId`] off
/// to whatever owns session binding (`carapace-session`'s claim
/// registry, wired up by the daemon). Kept as a trait rather than a
/// direct dependency so this crate does not need to know about session
/// management's internals.
pub trait SessionClaimSink: Send + Sync {
    /// Register `session_id` as belonging to `group`, so a container
    /// presenting it via `tool.invoke.get_session_info` can claim its
    /// binding.
    fn register(&self, session_id: SessionId, group: &GroupId);
}

struct ManagedContainer {
    container_id: String,
    group: GroupId,
    session_id: SessionId,
    ended: AtomicBool,
}

struct Inner {
    containers: HashMap<String, ManagedContainer>,
    queues: HashMap<GroupId, VecDeque<SessionId>>,
}

/// Spawns and supervises one container per triggered session, subject
/// to a per-group running cap, and tears everything down on shutdown.
pub struct LifecycleManager {
    runtime: Arc<dyn ContainerRuntime>,
    events: EventBus,
    resume: Arc<ResumeTokenStore>,
    claims: Arc<dyn SessionClaimSink>,
    groups: HashMap<GroupId, GroupSpawnConfig>,
    config: LifecycleConfig,
    state: Mutex<Inner>,
}

impl LifecycleManager {
    /// Build a manager over the given runtime, event bus, resume-token
    /// store, claim sink, and per-group spawn policies.
    #[must_use]
    pub fn new(        runtime: Arc<dyn ContainerRuntime>,
        events: EventBus,
        resume: Arc<ResumeTokenStore>,
        claims: Arc<dyn SessionClaimSink>,
        groups: HashMap<GroupId, GroupSpawnConfig>,
        config: LifecycleConfig,
) -> Self {
        Self {
            runtime,
            events,
            resume,
            claims,
            groups,
            config,
            state: Mutex::new(Inner { containers: HashMap::new(), queues: HashMap::new() }),
        }
    }

    /// Handle one `message.inbound`/`task.triggered` event. Spawns
    /// immediately if the group is under cap, otherwise enqueues,
    /// shedding the oldest queued trigger on overflow .
    pub async fn handle_trigger(&self, group: GroupId) -> Result<(), LifecycleError> {
        let Some(spawn_config) = self.groups.get(&group).cloned() else {
            return Err(LifecycleError::UnconfiguredGroup(group.0));
        };

        let session_id = SessionId::new();

        let should_spawn_now = {
            let mut state = self.state.lock().expect("lifecycle state mutex poisoned");
            let running = state.containers.values().filter(|c| c.group == group).count();
            if running < spawn_config.cap {
                true
            } else {
                let queue = state.queues.entry(group.clone()).or_default();
                queue.push_back(session_id);
                if queue.len() > self.config.spawn_queue_cap {
                    if let Some(shed) = queue.pop_front() {
                        warn!(%group, session = %shed, "spawn queue overflow, shedding oldest trigger");
                        self.emit_agent_error(&group, shed, "queue_overflow");
                    }
                }
                false
            }
        };

        if should_spawn_now {
            self.spawn_container(group, session_id, &spawn_config).await?;
        }

        Ok(())
    }

    async fn spawn_container(        &self,
        group: GroupId,
        session_id: SessionId,
        spawn_config: &GroupSpawnConfig,
) -> Result<(), LifecycleError> {
        let now = chrono::Utc::now().timestamp();
        let resume_token =
            self.resume.get_latest(group.clone(), now, carapace_audit::resume::DEFAULT_TTL_SECONDS).await?;

        let mut env = HashMap::from([
            ("sessionId".to_string(), session_id.to_string()),
            ("group".to_string(), group.0.clone()),
        ]);
        if let Some(token) = resume_token {
            env.insert("resumeToken".to_string(), token.claude_session_id.to_string());
        }

        let mut mounts = vec![
            BindMount {
                host_path: self.config.requests_socket.clone(),
                container_path: self.config.container_socket_dir.join("requests.sock"),
                read_only: false,
            },
            BindMount {
                host_path: self.config.events_socket.clone(),
                container_path: self.config.container_socket_dir.join("events.sock"),
                read_only: true,
            },
        ];
        mounts.extend(spawn_config.extra_mounts.clone());

        let labels = HashMap::from([
            ("carapace.session".to_string(), session_id.to_string()),
            ("carapace.group".to_string(), group.0.clone()),
        ]);

        let spec = ContainerSpec {
            image: spawn_config.image.clone(),
            mounts,
            env,
            read_only_rootfs: true,
            network_enabled: spawn_config.network_enabled,
            user: spawn_config.user.clone(),
            drop_capabilities: spawn_config.drop_capabilities.clone(),
            tmpfs_size_bytes: spawn_config.tmpfs_size_bytes,
            labels,
        };

        self.claims.register(session_id, &group);
        let container_id = self.runtime.run(&spec).await?;

        {
            let mut state = self.state.lock().expect("lifecycle state mutex poisoned");
            state.containers.insert(                container_id.clone(),
                ManagedContainer { container_id: container_id.clone(), group: group.clone(), session_id, ended: AtomicBool::new(false) },
);
        }

        info!(%group, %session_id, container_id = %container_id, "container started");
        self.events.publish(CarapaceEvent::new(            Topic::Fixed("agent.started"),
            "carapace",
            group,
            json!({ "sessionId": session_id.to_string(), "containerId": container_id }),
));

        Ok(())
    }

    /// Mark a container as having reached a natural end (`response.end`
    /// observed), so the crash poller stops treating it as unexpectedly
    /// exited. The daemon wiring calls this from its own subscription to
    /// the event bus.
    pub fn mark_ended(&self, container_id: &str) {
        let state = self.state.lock().expect("lifecycle state mutex poisoned");
        if let Some(container) = state.containers.get(container_id) {
            container.ended.store(true, Ordering::Relaxed);
        }
    }

    /// Run one crash-detection sweep: `inspect` every managed container
    /// not yet marked ended; a container found `Exited`/`Dead` is
    /// reported via `agent.error reason:"crashed"` and removed.
    pub async fn poll_crashes(&self) {
        let candidates: Vec<(String, GroupId, SessionId)> = {
            let state = self.state.lock().expect("lifecycle state mutex poisoned");
            state
                .containers
                .values()
                .filter(|c| !c.ended.load(Ordering::Relaxed))
                .map(|c| (c.container_id.clone(), c.group.clone(), c.session_id))
                .collect()
        };

        for (container_id, group, session_id) in candidates {
            let inspection = match self.runtime.inspect(&container_id).await {
                Ok(inspection) => inspection,
                Err(err) => {
                    warn!(container_id = %container_id, error = %err, "crash poll inspect failed");
                    continue;
                },
            };

            if matches!(inspection.state, ContainerState::Exited | ContainerState::Dead) {
                warn!(container_id = %container_id, %group, %session_id, "container crashed");
                self.emit_agent_error(&group, session_id, "crashed");
                let mut state = self.state.lock().expect("lifecycle state mutex poisoned");
                state.containers.remove(&container_id);
            }
        }
    }

    /// Run the crash-poller on a fixed interval until cancelled. Intended
    /// to be spawned as its own task by the daemon.
    pub async fn run_crash_poll_loop(&self) {
        let mut ticker = tokio::time::interval(self.config.crash_poll_interval);
        loop {
            ticker.tick().await;
            self.poll_crashes().await;
        }
    }

    /// Stop every managed container, in parallel: `stop(grace)`, then
    /// `remove`; stragglers still running after the grace window are
    /// `kill`ed first (shutdown sequencing).
    pub async fn shutdown(&self) {
        let containers: Vec<String> = {
            let state = self.state.lock().expect("lifecycle state mutex poisoned");
            state.containers.keys().cloned().collect()
        };

        let grace = self.config.stop_grace;
        let stops = containers.iter().map(|id| {
            let id = id.clone();
            async move {
                if self.runtime.stop(&id, grace).await.is_err() {
                    let _ = self.runtime.kill(&id).await;
                }
                let _ = self.runtime.remove(&id).await;
            }
        });
        futures::future::join_all(stops).await;

        let mut state = self.state.lock().expect("lifecycle state mutex poisoned");
        state.containers.clear();
        state.queues.clear();
    }

    /// Count of containers currently running for `group`.
    #[must_use]
    pub fn running_count(&self, group: &GroupId) -> usize {
        let state = self.state.lock().expect("lifecycle state mutex poisoned");
        state.containers.values().filter(|c| &c.group == group).count()
    }

    fn emit_agent_error(&self, group: &GroupId, session_id: SessionId, reason: &'static str) {
        self.events.publish(CarapaceEvent::new(            Topic::Fixed("agent.error"),
            "carapace",
            group.clone(),
            json!({ "sessionId": session_id.to_string(), "reason": reason }),
));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{ContainerInspection, ContainerState};
    use async_trait::async_trait;
    use carapace_audit::resume::ResumeTokenStore;
    use std::sync::atomic::AtomicUsize;

    struct FakeRuntime {
        next_id: AtomicUsize,
        states: Mutex<HashMap<String, ContainerState>>,
    }

    impl FakeRuntime {
        fn new() -> Self {
            Self { next_id: AtomicUsize::new(0), states: Mutex::new(HashMap::new()) }
        }

        fn set_state(&self, id: &str, state: ContainerState) {
            self.states.lock().unwrap().insert(id.to_string(), state);
        }
    }

    #[async_trait]
    impl ContainerRuntime for FakeRuntime {
        async fn is_available(&self) -> bool {
            true
        }
        async fn version(&self) -> Result<String, crate::error::RuntimeError> {
            Ok("fake/1.0".to_string())
        }
        async fn pull(&self, _image: &str) -> Result<(), crate::error::RuntimeError> {
            Ok(())
        }
        async fn image_exists(&self, _image: &str) -> Result<bool, crate::error::RuntimeError> {
            Ok(true)
        }
        async fn build(&self, _context_dir: &std::path::Path, _tag: &str) -> Result<(), crate::error::RuntimeError> {
            Ok(())
        }
        async fn inspect_labels(&self, _container_id: &str) -> Result<HashMap<String, String>, crate::error::RuntimeError> {
            Ok(HashMap::new())
        }
        async fn run(&self, _spec: &ContainerSpec) -> Result<String, crate::error::RuntimeError> {
            let id = format!("c{}", self.next_id.fetch_add(1, Ordering::Relaxed));
            self.set_state(&id, ContainerState::Running);
            Ok(id)
        }
        async fn stop(&self, container_id: &str, _timeout: Duration) -> Result<(), crate::error::RuntimeError> {
            self.set_state(container_id, ContainerState::Exited);
            Ok(())
        }
        async fn kill(&self, container_id: &str) -> Result<(), crate::error::RuntimeError> {
            self.set_state(container_id, ContainerState::Exited);
            Ok(())
        }
        async fn remove(&self, _container_id: &str) -> Result<(), crate::error::RuntimeError> {
            Ok(())
        }
        async fn inspect(&self, container_id: &str) -> Result<ContainerInspection, crate::error::RuntimeError> {
            let state = self.states.lock().unwrap().get(container_id).copied().unwrap_or(ContainerState::Unknown);
            Ok(ContainerInspection { state, exit_code: None })
        }
    }

    struct NoopClaimSink;
    impl SessionClaimSink for NoopClaimSink {
        fn register(&self, _session_id: SessionId, _group: &GroupId) {}
    }

    fn test_config() -> LifecycleConfig {
        LifecycleConfig {
            requests_socket: "/home/carapace/run/sockets/requests.sock".into(),
            events_socket: "/home/carapace/run/sockets/events.sock".into(),
            container_socket_dir: "/run/carapace".into(),
            crash_poll_interval: Duration::from_millis(10),
            stop_grace: Duration::from_millis(10),
            spawn_queue_cap: 2,
        }
    }

    fn manager_with_cap(cap: usize) -> (LifecycleManager, GroupId, Arc<FakeRuntime>) {
        let group = GroupId::new("acme");
        let mut groups = HashMap::new();
        groups.insert(            group.clone(),
            GroupSpawnConfig {
                image: "carapace/agent:latest".to_string(),
                cap,
                extra_mounts: vec![],
                network_enabled: false,
                user: "1000:1000".to_string(),
                drop_capabilities: vec!["ALL".to_string()],
                tmpfs_size_bytes: 1024,
            },
);
        let runtime = Arc::new(FakeRuntime::new());
        let manager = LifecycleManager::new(            runtime.clone(),
            EventBus::new(),
            Arc::new(ResumeTokenStore::open_in_memory().unwrap()),
            Arc::new(NoopClaimSink),
            groups,
            test_config(),
);
        (manager, group, runtime)
    }

    #[tokio::test]
    async fn spawns_immediately_under_cap() {
        let (manager, group, _runtime) = manager_with_cap(2);
        manager.handle_trigger(group.clone()).await.unwrap();
        assert_eq!(manager.running_count(&group), 1);
    }

    #[tokio::test]
    async fn unconfigured_group_is_rejected() {
        let (manager, _group, _runtime) = manager_with_cap(1);
        let err = manager.handle_trigger(GroupId::new("other")).await.unwrap_err();
        assert!(matches!(err, LifecycleError::UnconfiguredGroup(_)));
    }

    #[tokio::test]
    async fn queues_when_at_cap_and_sheds_oldest_on_overflow() {
        let (manager, group, _runtime) = manager_with_cap(1);
        manager.handle_trigger(group.clone()).await.unwrap();
        assert_eq!(manager.running_count(&group), 1);

        // Queue three more beyond the cap of 2 queued entries; the first
        // queued trigger should be shed, not the second.
        let mut rx = manager.events.subscribe();
        manager.handle_trigger(group.clone()).await.unwrap();
        manager.handle_trigger(group.clone()).await.unwrap();
        manager.handle_trigger(group.clone()).await.unwrap();

        // still only one running; the rest queued or shed
        assert_eq!(manager.running_count(&group), 1);

        let mut saw_overflow = false;
        while let Some(event) = rx.try_recv() {
            if event.topic == Topic::Fixed("agent.error") {
                saw_overflow = true;
            }
        }
        assert!(saw_overflow);
    }

    #[tokio::test]
    async fn crash_poll_reports_and_removes_exited_container() {
        let (manager, group, runtime) = manager_with_cap(2);
        manager.handle_trigger(group.clone()).await.unwrap();
        assert_eq!(manager.running_count(&group), 1);

        let container_id = {
            let state = manager.state.lock().unwrap();
            state.containers.keys().next().unwrap().clone()
        };
        // simulate an out-of-band crash (not via manager.shutdown/stop)
        runtime.set_state(&container_id, ContainerState::Dead);

        let mut rx = manager.events.subscribe();
        manager.poll_crashes().await;
        assert_eq!(manager.running_count(&group), 0);

        let mut saw_crash = false;
        while let Some(event) = rx.try_recv() {
            if event.topic == Topic::Fixed("agent.error") {
                saw_crash = true;
            }
        }
        assert!(saw_crash);
    }

    #[tokio::test]
    async fn shutdown_clears_every_managed_container() {
        let (manager, group, _runtime) = manager_with_cap(3);
        manager.handle_trigger(group.clone()).await.unwrap();
        manager.handle_trigger(group.clone()).await.unwrap();
        assert_eq!(manager.running_count(&group), 2);

        manager.shutdown().await;
        assert_eq!(manager.running_count(&group), 0);
    }

    #[tokio::test]
    async fn mark_ended_excludes_container_from_crash_poll() {
        let (manager, group, runtime) = manager_with_cap(1);
        manager.handle_trigger(group.clone()).await.unwrap();
        let container_id = {
            let state = manager.state.lock().unwrap();
            state.containers.keys().next().unwrap().clone()
        };
        manager.mark_ended(&container_id);
        runtime.set_state(&container_id, ContainerState::Exited);
        manager.poll_crashes().await;
        // still tracked (ended containers are skipped, not removed, by the poller)
        assert_eq!(manager.running_count(&group), 1);
    }
}
