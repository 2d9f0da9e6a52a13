//! Bridges the event bus to the per-container output reader and the
//! lifecycle manager's `mark_ended` bookkeeping.
//!
//! `carapace-reader` has no back-pointer to `carapace-lifecycle`, and
//! neither crate knows how a container's stdout stream is obtained —
//! that's a daemon-level concern, since it means shelling out to the
//! configured runtime binary's `logs -f`. This module is the glue: it
//! watches `agent.started` to attach a reader per container, and
//! `response.end` to tell the lifecycle manager a container reached a
//! natural end rather than a crash.

use carapace_audit::ResumeTokenStore;
use carapace_core::{GroupId, Topic};
use carapace_events::EventBus;
use carapace_lifecycle::RuntimeFlavor;
use carapace_reader::ContainerOutputReader;
use carapace_sanitize::Sanitizer;
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::BufReader;
use tokio::process::Command;
use tracing::{debug, warn};

/// Collaborators the attach-on-start / mark-ended-on-end loop needs.
pub struct ContainerBridge {
    pub flavor: RuntimeFlavor,
    pub bus: Arc<EventBus>,
    pub resume: Arc<ResumeTokenStore>,
    pub sanitizer: Option<Sanitizer>,
    pub lifecycle: Arc<carapace_lifecycle::LifecycleManager>,
}

impl ContainerBridge {
    /// Run until the event bus itself closes (only happens at process
    /// teardown, since [`EventBus`] is held alive by the daemon for the
    /// whole run).
    pub async fn run(self) {
        let mut receiver = self.bus.subscribe();
        while let Some(event) = receiver.recv().await {
            match &event.topic {
                Topic::Fixed("agent.started") => self.attach(&event),
                Topic::Fixed("response.end") => self.mark_ended(&event),
                _ => {},
            }
        }
    }

    fn attach(&self, event: &carapace_events::CarapaceEvent) {
        let Some(container_id) = event.envelope.payload.get("containerId").and_then(|v| v.as_str()) else {
            warn!("agent.started event missing containerId, cannot attach output reader");
            return;
        };
        let container_id = container_id.to_string();
        let group = event.envelope.group.clone();

        let flavor = self.flavor;
        let bus = Arc::clone(&self.bus);
        let resume = Arc::clone(&self.resume);
        let sanitizer = self.sanitizer.clone();

        tokio::spawn(async move {
            run_reader(flavor, container_id, group, bus, resume, sanitizer).await;
        });
    }

    fn mark_ended(&self, event: &carapace_events::CarapaceEvent) {
        self.lifecycle.mark_ended(&event.envelope.source);
    }
}

async fn run_reader(
    flavor: RuntimeFlavor,
    container_id: String,
    group: GroupId,
    bus: Arc<EventBus>,
    resume: Arc<ResumeTokenStore>,
    sanitizer: Option<Sanitizer>,
) {
    let mut command = Command::new(flavor.binary());
    command.arg("logs").arg("--follow").arg(&container_id);
    command.stdin(Stdio::null());
    command.stdout(Stdio::piped());
    command.stderr(Stdio::null());

    let mut child = match command.spawn() {
        Ok(child) => child,
        Err(err) => {
            warn!(container_id = %container_id, error = %err, "failed to attach to container logs");
            return;
        },
    };

    let Some(stdout) = child.stdout.take() else {
        warn!(container_id = %container_id, "log-follow process has no stdout");
        return;
    };

    let mut reader = ContainerOutputReader::new(container_id.clone(), group, bus).with_resume_store(resume);
    if let Some(sanitizer) = sanitizer {
        reader = reader.with_sanitizer(sanitizer);
    }

    if let Err(err) = reader.run(BufReader::new(stdout)).await {
        debug!(container_id = %container_id, error = %err, "container output stream ended with an error");
    }

    let _ = child.wait().await;
}
