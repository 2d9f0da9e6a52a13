//! Builds every subsystem from a [`CarapaceConfig`] and ties them
//! together behind a [`RequestPipeline`].

use crate::claims::ClaimSinkAdapter;
use crate::containers::ContainerBridge;
use crate::plugins::{self, NullPluginHandlerFactory};
use anyhow::{Context, Result};
use carapace_audit::{AuditLog, ResumeTokenStore};
use carapace_catalog::Catalog;
use carapace_confirm::ConfirmationGate;
use carapace_config::{CarapaceConfig, Layout};
use carapace_core::GroupId;
use carapace_events::EventBus;
use carapace_lifecycle::{GroupSpawnConfig, LifecycleConfig, LifecycleManager, RuntimeFlavor, SubprocessRuntime};
use carapace_plugins::LoadedPlugin;
use carapace_ratelimit::{RateLimitConfig, RateLimiter};
use carapace_pipeline::{PipelineConfig, PreapprovalSet, RequestPipeline};
use carapace_session::{ClaimRegistry, SessionManager};
use carapace_transport::{PubServer, RouterServer};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Every long-lived handle the daemon needs to run and later tear down.
pub struct Daemon {
    pub router: RouterServer,
    pub pub_server: PubServer,
    pub pipeline: Arc<RequestPipeline>,
    pub lifecycle: Arc<LifecycleManager>,
    pub confirm: Arc<ConfirmationGate>,
    pub catalog: Arc<Catalog>,
    pub plugins: Vec<LoadedPlugin>,
    pub container_bridge: ContainerBridge,
    pub layout: Layout,
}

/// Build every subsystem described by `config`, binding both sockets in
/// the process. Returns an error only for conditions that should abort
/// startup outright (a socket already bound, an unreadable audit
/// database, and the like) — matching the teacher's convention of
/// aggregating fatal startup failures through `anyhow` at the binary
/// boundary while every library crate underneath keeps its own
/// `thiserror` error type.
pub async fn build(config: &CarapaceConfig) -> Result<Daemon> {
    let layout = config.layout();
    std::fs::create_dir_all(&layout.data_dir).context("creating data directory")?;
    std::fs::create_dir_all(&layout.credentials_dir).context("creating credentials directory")?;

    let events = EventBus::new();
    let catalog = Arc::new(Catalog::new());
    let sessions = Arc::new(SessionManager::with_cap(config.session_cap_per_group));
    let claims = Arc::new(ClaimRegistry::new());
    let limiter = Arc::new(RateLimiter::new(RateLimitConfig {
        requests_per_minute: config.rate_limit.requests_per_minute,
        burst_size: config.rate_limit.burst_size,
    }));
    let confirm = Arc::new(ConfirmationGate::with_timeout(Duration::from_secs(config.confirmation_timeout_secs)));
    let preapproval = Arc::new(PreapprovalSet::new());
    let audit = Arc::new(AuditLog::open(&layout.audit_db).context("opening audit log")?);
    let resume = Arc::new(ResumeTokenStore::open(&layout.resume_db).context("opening resume-token store")?);
    let sanitizer = crate::sanitizer::build(&config.sanitizer);

    let flavor = match config.container.runtime.as_str() {
        "podman" => RuntimeFlavor::Podman,
        _ => RuntimeFlavor::Docker,
    };
    let runtime = Arc::new(SubprocessRuntime::new(flavor));

    let groups = group_spawn_configs(config);
    let lifecycle_config = LifecycleConfig {
        requests_socket: layout.requests_socket.clone(),
        events_socket: layout.events_socket.clone(),
        container_socket_dir: config.container.container_socket_dir.clone(),
        crash_poll_interval: Duration::from_secs(config.container.crash_poll_interval_secs),
        stop_grace: Duration::from_secs(config.container.stop_grace_secs),
        spawn_queue_cap: config.container.spawn_queue_cap,
    };
    let claim_sink = Arc::new(ClaimSinkAdapter(Arc::clone(&claims)));
    let lifecycle = Arc::new(LifecycleManager::new(
        runtime,
        events.clone(),
        Arc::clone(&resume),
        claim_sink,
        groups,
        lifecycle_config,
    ));

    let loaded_plugins =
        plugins::load_all(Arc::clone(&catalog), &config.plugin_roots, &NullPluginHandlerFactory).await;

    let pipeline = Arc::new(RequestPipeline::new(
        Arc::clone(&catalog),
        sessions,
        claims,
        Arc::clone(&limiter),
        Arc::clone(&confirm),
        preapproval,
        audit,
        PipelineConfig { handler_timeout: Duration::from_secs(config.handler_timeout_secs) },
    ));

    let router = RouterServer::bind(&layout.socket_dir, layout.requests_socket.clone())
        .await
        .context("binding ROUTER socket")?;
    let pub_server =
        PubServer::bind(&layout.socket_dir, layout.events_socket.clone()).await.context("binding PUB socket")?;

    let container_bridge = ContainerBridge {
        flavor,
        bus: Arc::new(events),
        resume,
        sanitizer,
        lifecycle: Arc::clone(&lifecycle),
    };

    Ok(Daemon {
        router,
        pub_server,
        pipeline,
        lifecycle,
        confirm,
        catalog,
        plugins: loaded_plugins,
        container_bridge,
        layout,
    })
}

fn group_spawn_configs(config: &CarapaceConfig) -> HashMap<GroupId, GroupSpawnConfig> {
    config
        .groups
        .iter()
        .map(|(name, group)| {
            let image = if group.image.is_empty() { config.container.default_image.clone() } else { group.image.clone() };
            (
                GroupId::new(name.clone()),
                GroupSpawnConfig {
                    image,
                    cap: group.cap,
                    extra_mounts: Vec::new(),
                    network_enabled: !group.network_allowlist.is_empty(),
                    user: group.user.clone(),
                    drop_capabilities: group.drop_capabilities.clone(),
                    tmpfs_size_bytes: group.tmpfs_size_bytes,
                },
            )
        })
        .collect()
}
