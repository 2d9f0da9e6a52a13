//! The six-stage request pipeline : parse → lookup → validate →
//! authorise → confirm → dispatch.
//!
//! Every stage's termination (success or failure) is recorded to the
//! audit log with the stage index reached . A response
//! envelope is emitted for every accepted frame carrying a non-empty
//! `correlation`; frames without one are silently dropped (invariant
//! 1) since there is nothing to echo a response against.

use crate::builtin::{get_diagnostics, list_tools};
use crate::config::PipelineConfig;
use crate::correlation;
use crate::error::PipelineError;
use crate::preapproval::PreapprovalSet;
use async_trait::async_trait;
use carapace_audit::{AuditLog, AuditRow};
use carapace_catalog::{Catalog, HandlerFailure, ToolContext, ToolDeclaration};
use carapace_confirm::{ConfirmationGate, ConfirmationOutcome};
use carapace_core::envelope::{Envelope, WireMessage};
use carapace_core::{ConfirmationId, CorrelationId, ErrorCode, ErrorPayload, GroupId, SessionId, Topic};
use carapace_ratelimit::RateLimiter;
use carapace_session::{ClaimRegistry, SessionManager};
use carapace_transport::{ConnectionIdentity, RequestHandler};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Stable producer id stamped as `source` on every core-originated
/// response envelope .
pub const SOURCE: &str = "carapace";

/// Group used for error responses that occur before a session exists
/// (the claim handshake itself failed). Never used for anything else.
const UNCLAIMED_GROUP: &str = "unclaimed";

/// Ties every pipeline collaborator together and implements
/// [`RequestHandler`], the seam the transport layer drives requests
/// through.
pub struct RequestPipeline {
    catalog: Arc<Catalog>,
    sessions: Arc<SessionManager>,
    claims: Arc<ClaimRegistry>,
    limiter: Arc<RateLimiter>,
    confirm: Arc<ConfirmationGate>,
    preapproval: Arc<PreapprovalSet>,
    audit: Arc<AuditLog>,
    config: PipelineConfig,
}

/// Outcome of a single terminated stage: either the next stage's input,
/// or a response to emit immediately.
enum StageResult<T> {
    Proceed(T),
    Respond(Envelope),
}

impl RequestPipeline {
    /// Construct a pipeline from its collaborators.
    #[must_use]
    pub fn new(        catalog: Arc<Catalog>,
        sessions: Arc<SessionManager>,
        claims: Arc<ClaimRegistry>,
        limiter: Arc<RateLimiter>,
        confirm: Arc<ConfirmationGate>,
        preapproval: Arc<PreapprovalSet>,
        audit: Arc<AuditLog>,
        config: PipelineConfig,
) -> Self {
        Self { catalog, sessions, claims, limiter, confirm, preapproval, audit, config }
    }

    /// Drive one wire message through the pipeline, resolving the
    /// session first if it isn't already bound ('s claim handshake).
    async fn process(&self, identity: ConnectionIdentity, wire: WireMessage) -> Option<Envelope> {
        let started = Instant::now();
        let correlation_raw = wire.correlation.as_deref().filter(|c| !c.is_empty());
        let Some(correlation_raw) = correlation_raw else {
            debug!(%identity, "dropping frame with no correlation");
            return None;
        };
        let correlation = correlation::coerce(correlation_raw);

        let session = match self.sessions.lookup(identity) {
            Some(session) => session,
            None => match self.establish_session(identity, &wire, correlation).await {
                StageResult::Proceed(session) => session,
                StageResult::Respond(envelope) => return Some(envelope),
            },
        };

        let response = self.dispatch(session.session_id, session.group.clone(), &wire, correlation, started).await;
        Some(response)
    }

    /// Redeem a `get_session_info` claim to establish the session for a
    /// previously-unknown connection identity. Any other topic arriving
    /// before a session exists is rejected.
    async fn establish_session(        &self,
        identity: ConnectionIdentity,
        wire: &WireMessage,
        correlation: CorrelationId,
) -> StageResult<carapace_session::Session> {
        if wire.topic != "tool.invoke.get_session_info" {
            return StageResult::Respond(self.error_envelope(                UNCLAIMED_GROUP,
                correlation,
                ErrorPayload::new(ErrorCode::Unauthorized, PipelineError::NoSession.to_string()),
));
        }

        let Some(claim) = wire.arguments.get("claim").and_then(Value::as_str) else {
            return StageResult::Respond(self.error_envelope(                UNCLAIMED_GROUP,
                correlation,
                ErrorPayload::new(ErrorCode::ValidationFailed, PipelineError::MalformedClaim.to_string())
                    .with_field("claim"),
));
        };

        let Some(group) = self.claims.resolve(claim) else {
            return StageResult::Respond(self.error_envelope(                UNCLAIMED_GROUP,
                correlation,
                ErrorPayload::new(ErrorCode::Unauthorized, PipelineError::UnknownClaim.to_string()),
));
        };

        match self.sessions.bind_or_create_session(identity, group.clone()) {
            Ok(session) => StageResult::Proceed(session),
            Err(err) => StageResult::Respond(self.error_envelope(                group.as_str(),
                correlation,
                ErrorPayload::new(ErrorCode::RateLimited, err.to_string()),
)),
        }
    }

    /// Run stages 1-6 for an already-bound session.
    #[allow(clippy::too_many_lines)]
    async fn dispatch(        &self,
        session_id: SessionId,
        group: GroupId,
        wire: &WireMessage,
        correlation: CorrelationId,
        started: Instant,
) -> Envelope {
        // Stage 1: parse.
        if !wire.arguments.is_object() {
            return self.terminate(                session_id,
                &group,
                "<malformed>",
                correlation,
                1,
                started,
                Err(ErrorPayload::new(ErrorCode::ValidationFailed, "arguments must be an object").with_stage(1)),
);
        }

        let Ok(topic) = Topic::parse(&wire.topic) else {
            return self.terminate(                session_id,
                &group,
                &wire.topic,
                correlation,
                2,
                started,
                Err(ErrorPayload::new(ErrorCode::UnknownTool, format!("unrecognised topic '{}'", wire.topic))),
);
        };
        let Some(tool_name) = topic.tool_name() else {
            return self.terminate(                session_id,
                &group,
                &wire.topic,
                correlation,
                2,
                started,
                Err(ErrorPayload::new(ErrorCode::UnknownTool, format!("'{}' is not a tool invocation", wire.topic))),
);
        };

        // Reserved built-ins bypass the catalog entirely (stage 2's own special case).
        if let Some(result) = self.try_builtin(tool_name, session_id, &group) {
            return self.terminate(session_id, &group, tool_name, correlation, 6, started, Ok(result));
        }

        // Stage 2: lookup.
        let Some((declaration, handler)) = self.catalog.lookup(tool_name) else {
            return self.terminate(                session_id,
                &group,
                tool_name,
                correlation,
                2,
                started,
                Err(ErrorPayload::new(ErrorCode::UnknownTool, format!("no such tool '{tool_name}'"))),
);
        };

        // Stage 3: validate.
        if let Err(failure) = carapace_catalog::validate_arguments(&declaration.arguments_schema, &wire.arguments) {
            return self.terminate(                session_id,
                &group,
                tool_name,
                correlation,
                3,
                started,
                Err(ErrorPayload::new(ErrorCode::ValidationFailed, failure.reason).with_field(failure.field)),
);
        }

        // Stage 4: authorise + throttle.
        if !declaration.permits_group(&group) {
            return self.terminate(                session_id,
                &group,
                tool_name,
                correlation,
                4,
                started,
                Err(ErrorPayload::new(ErrorCode::Unauthorized, format!("group '{group}' may not call '{tool_name}'"))),
);
        }
        if let Err(retry_after) = self.limiter.try_acquire(session_id, tool_name) {
            return self.terminate(                session_id,
                &group,
                tool_name,
                correlation,
                4,
                started,
                Err(ErrorPayload::new(ErrorCode::RateLimited, "rate limit exceeded").with_retry_after(retry_after)),
);
        }

        // Stage 5: confirm.
        if declaration.risk_level.requires_confirmation() && !self.preapproval.take(correlation) {
            if let Some(outcome) = self.await_confirmation(tool_name).await {
                if !outcome.approved {
                    let code = match outcome {
                        ConfirmationOutcome::Denied => ErrorCode::ConfirmationDenied,
                        _ => ErrorCode::ConfirmationTimeout,
                    };
                    return self.terminate(                        session_id,
                        &group,
                        tool_name,
                        correlation,
                        5,
                        started,
                        Err(ErrorPayload::new(code, format!("confirmation {}", outcome.reason.unwrap_or("failed")))),
);
                }
            }
        }

        // Stage 6: dispatch.
        let ctx = ToolContext { session_id, group: group.clone(), correlation: Some(correlation) };
        let result = tokio::time::timeout(self.config.handler_timeout, handler.call(ctx, wire.arguments.clone())).await;
        let outcome = match result {
            Err(_) => Err(ErrorPayload::new(ErrorCode::PluginTimeout, "handler exceeded its deadline")),
            Ok(Err(HandlerFailure::Timeout)) => Err(ErrorPayload::new(ErrorCode::PluginTimeout, "handler timed out")),
            Ok(Err(HandlerFailure::Unavailable(reason))) => {
                Err(ErrorPayload::new(ErrorCode::PluginUnavailable, reason))
            },
            Ok(Err(HandlerFailure::PluginError(reason))) => {
                Err(ErrorPayload::new(ErrorCode::PluginError, reason))
            },
            Ok(Err(HandlerFailure::HandlerError(reason))) => {
                Err(ErrorPayload::new(ErrorCode::HandlerError, reason))
            },
            Ok(Ok(value)) => Ok(value),
        };

        self.terminate(session_id, &group, tool_name, correlation, 6, started, outcome)
    }

    /// `list_tools` and `get_diagnostics` are answered directly rather
    /// than dispatched through the catalog (stage 2's special
    /// case). `get_session_info` on an already-bound identity just
    /// echoes the session it already resolved to.
    fn try_builtin(&self, tool_name: &str, session_id: SessionId, group: &GroupId) -> Option<Value> {
        match tool_name {
            "list_tools" => Some(list_tools(&self.catalog, group)),
            "get_diagnostics" => Some(get_diagnostics(&self.catalog, &self.confirm, &self.limiter)),
            "get_session_info" => Some(json!({ "sessionId": session_id.to_string(), "group": group.as_str() })),
            _ => None,
        }
    }

    async fn await_confirmation(&self, tool_name: &str) -> Option<ConfirmationOutcome> {
        let id = ConfirmationId::new();
        match self.confirm.request(id, tool_name) {
            Ok(receiver) => receiver.await.ok(),
            Err(err) => {
                warn!(%id, error = %err, "confirmation request rejected, treating as denied");
                Some(ConfirmationOutcome::Denied)
            },
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn terminate(        &self,
        session_id: SessionId,
        group: &GroupId,
        tool: &str,
        correlation: CorrelationId,
        stage: u8,
        started: Instant,
        outcome: Result<Value, ErrorPayload>,
) -> Envelope {
        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        let code = outcome.as_ref().err().map(|e| e.code);
        let ts = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
            .unwrap_or(0);
        let row = AuditRow {
            ts,
            session: session_id,
            group: group.clone(),
            tool: tool.to_string(),
            correlation: Some(correlation),
            stage,
            code,
            duration_ms,
        };
        let audit = Arc::clone(&self.audit);
        tokio::spawn(async move {
            if let Err(err) = audit.record(row).await {
                warn!(error = %err, "failed to write audit row");
            }
        });

        match outcome {
            Ok(result) => Envelope::response(SOURCE, group.clone(), correlation, Some(result), None),
            Err(error) => Envelope::response(SOURCE, group.clone(), correlation, None, Some(error)),
        }
    }

    fn error_envelope(&self, group: &str, correlation: CorrelationId, error: ErrorPayload) -> Envelope {
        Envelope::response(SOURCE, GroupId::new(group), correlation, None, Some(error))
    }
}

#[async_trait]
impl RequestHandler for RequestPipeline {
    async fn handle(&self, identity: ConnectionIdentity, wire: WireMessage) -> Option<Envelope> {
        self.process(identity, wire).await
    }

    async fn on_disconnect(&self, identity: ConnectionIdentity) {
        if let Some(session) = self.sessions.destroy(identity) {
            self.limiter.remove_session(session.session_id);
        }
    }
}
