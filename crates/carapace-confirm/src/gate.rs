//! The confirmation gate : single-shot awaitables keyed by
//! confirmation id. `approve`/`deny`/`cancel`/timeout all resolve
//! through one path ([`ConfirmationGate::resolve`]) so an id can never
//! be resolved twice.

use crate::error::ConfirmError;
use crate::outcome::ConfirmationOutcome;
use carapace_core::ConfirmationId;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::debug;

/// Default confirmation timeout .
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5 * 60);

struct Pending {
    sender: oneshot::Sender<ConfirmationOutcome>,
    tool_name: String,
}

/// Tracks pending human confirmations for high-risk tool invocations.
#[derive(Clone)]
pub struct ConfirmationGate {
    pending: Arc<DashMap<ConfirmationId, Pending>>,
    default_timeout: Duration,
}

impl ConfirmationGate {
    /// Construct a gate using the default 5-minute timeout.
    #[must_use]
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    /// Construct a gate with an explicit default timeout.
    #[must_use]
    pub fn with_timeout(default_timeout: Duration) -> Self {
        Self { pending: Arc::new(DashMap::new()), default_timeout }
    }

    /// Create a pending confirmation, returning a receiver that
    /// resolves once `approve`/`deny`/`cancel` is called or the timer
    /// expires. Fails if `id` is already pending .
    pub fn request(        &self,
        id: ConfirmationId,
        tool_name: impl Into<String>,
) -> Result<oneshot::Receiver<ConfirmationOutcome>, ConfirmError> {
        let (sender, receiver) = oneshot::channel();
        let tool_name = tool_name.into();

        match self.pending.entry(id) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                return Err(ConfirmError::DuplicateId(id.to_string()));
            },
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(Pending { sender, tool_name: tool_name.clone() });
            },
        }

        debug!(%id, tool = %tool_name, "confirmation requested");

        let gate = self.clone();
        let timeout = self.default_timeout;
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            gate.resolve(id, ConfirmationOutcome::TimedOut);
        });

        Ok(receiver)
    }

    /// Approve a pending confirmation.
    pub fn approve(&self, id: ConfirmationId) -> Result<(), ConfirmError> {
        self.resolve(id, ConfirmationOutcome::Approved)
    }

    /// Deny a pending confirmation.
    pub fn deny(&self, id: ConfirmationId) -> Result<(), ConfirmError> {
        self.resolve(id, ConfirmationOutcome::Denied)
    }

    /// Cancel a single pending confirmation; resolves as a timeout .
    pub fn cancel(&self, id: ConfirmationId) -> Result<(), ConfirmError> {
        self.resolve(id, ConfirmationOutcome::TimedOut)
    }

    /// Cancel every pending confirmation, e.g. on shutdown (drain
    /// sequencing: "unresolved confirmations are cancelled-as-timeout").
    pub fn cancel_all(&self) {
        let ids: Vec<ConfirmationId> = self.pending.iter().map(|e| *e.key()).collect();
        for id in ids {
            let _ = self.resolve(id, ConfirmationOutcome::TimedOut);
        }
    }

    /// Number of confirmations currently awaiting resolution.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    fn resolve(&self, id: ConfirmationId, outcome: ConfirmationOutcome) -> Result<(), ConfirmError> {
        let Some((_, entry)) = self.pending.remove(&id) else {
            return Err(ConfirmError::NotPending(id.to_string()));
        };
        debug!(%id, tool = %entry.tool_name, ?outcome, "confirmation resolved");
        let _ = entry.sender.send(outcome);
        Ok(())
    }
}

impl Default for ConfirmationGate {
    fn default() -> Self {
        Self::new()
    }
}
