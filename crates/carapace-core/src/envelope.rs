//! The [`Envelope`] and client-supplied [`WireMessage`].
//!
//! Wire and identity field sets are disjoint by construction: [`WireMessage`]
//! only ever deserializes the three client-owned fields, so a spoofed
//! `source`/`group`/`id` on the inbound frame is simply ignored by serde
//! rather than accepted — the decoder additionally rejects such frames
//! explicitly (parse stage) by checking the raw JSON object's key set
//! before the typed deserialize.

use crate::error::ErrorPayload;
use crate::ids::{CorrelationId, EnvelopeId, GroupId};
use crate::timestamp::Timestamp;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Current protocol version. A single integer; no schema evolution beyond
/// this.
pub const PROTOCOL_VERSION: u32 = 1;

/// The six identity fields every envelope carries on both sockets.
/// Set exclusively by the core — never by a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Fresh identifier for this envelope.
    pub id: EnvelopeId,
    /// Protocol version (currently always [`PROTOCOL_VERSION`]).
    pub version: u32,
    /// `event` | `request` | `response`.
    #[serde(rename = "type")]
    pub kind: EnvelopeKind,
    /// Stable producer id (e.g. a container id, or `"carapace"` for core-originated events).
    pub source: String,
    /// Authorisation namespace / resume-token key.
    pub group: GroupId,
    /// When the envelope was produced.
    pub timestamp: Timestamp,
    /// `correlation` is non-empty on requests, echoed on responses, `None` on events.
    pub correlation: Option<CorrelationId>,
    /// Topic-specific payload.
    pub payload: Value,
}

/// Discriminates the three envelope kinds carried on the sockets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvelopeKind {
    /// Published on the event bus (PUB/SUB).
    Event,
    /// Inbound on the ROUTER socket.
    Request,
    /// Outbound on the ROUTER socket, echoing a request's correlation.
    Response,
}

impl Envelope {
    /// Construct an envelope, stamping all identity fields.
    #[must_use]
    pub fn new(
        kind: EnvelopeKind,
        source: impl Into<String>,
        group: GroupId,
        correlation: Option<CorrelationId>,
        payload: Value,
    ) -> Self {
        Self {
            id: EnvelopeId::new(),
            version: PROTOCOL_VERSION,
            kind,
            source: source.into(),
            group,
            timestamp: Timestamp::now(),
            correlation,
            payload,
        }
    }

    /// Build a response envelope echoing a request's correlation id.
    #[must_use]
    pub fn response(
        source: impl Into<String>,
        group: GroupId,
        correlation: CorrelationId,
        result: Option<Value>,
        error: Option<ErrorPayload>,
    ) -> Self {
        let payload = serde_json::to_value(ResponsePayload { result, error })
            .expect("ResponsePayload always serializes");
        Self::new(EnvelopeKind::Response, source, group, Some(correlation), payload)
    }
}

/// The response payload shape (invariant: `result` and `error`
/// are never both non-null).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponsePayload {
    /// Successful tool result, or `None` on failure.
    pub result: Option<Value>,
    /// Structured failure, or `None` on success.
    pub error: Option<ErrorPayload>,
}

impl ResponsePayload {
    /// Whether this payload upholds the never-both-non-null invariant.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        !(self.result.is_some() && self.error.is_some())
    }
}

/// The three-field object a client supplies inside a request frame.
/// Deliberately carries none of the six identity fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireMessage {
    /// Dotted topic string (validated by [`crate::topic::Topic`]).
    pub topic: String,
    /// Non-empty on requests; absent/null is treated as "drop silently" by
    /// the parse stage.
    pub correlation: Option<String>,
    /// Tool arguments (or empty object for topics that take none).
    pub arguments: Value,
}

/// Identity field names that must never appear on an inbound wire object —
/// checked against the raw JSON object keys before typed deserialization.
pub const IDENTITY_FIELD_NAMES: &[&str] =
    &["id", "version", "type", "source", "group", "timestamp"];

/// Returns the first identity field name found on a raw wire object, if any.
///
/// Used by the parse stage to reject spoofed frames before the frame is
/// ever handed to [`WireMessage`]'s typed decode.
#[must_use]
pub fn spoofed_identity_field(raw: &Value) -> Option<&'static str> {
    let obj = raw.as_object()?;
    IDENTITY_FIELD_NAMES.iter().find(|name| obj.contains_key(**name)).copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn envelope_round_trips_through_json() {
        let env = Envelope::new(
            EnvelopeKind::Event,
            "container-1",
            GroupId::new("acme"),
            None,
            json!({"hello": "world"}),
        );
        let text = serde_json::to_string(&env).unwrap();
        let back: Envelope = serde_json::from_str(&text).unwrap();
        assert_eq!(env, back);
    }

    #[test]
    fn envelope_always_stamps_current_protocol_version() {
        let env = Envelope::new(EnvelopeKind::Request, "x", GroupId::new("g"), None, json!({}));
        assert_eq!(env.version, PROTOCOL_VERSION);
    }

    #[test]
    fn response_payload_rejects_double_non_null() {
        let bad = ResponsePayload {
            result: Some(json!({"ok": true})),
            error: Some(ErrorPayload::new(crate::ErrorCode::HandlerError, "oops")),
        };
        assert!(!bad.is_well_formed());

        let good = ResponsePayload { result: Some(json!({"ok": true})), error: None };
        assert!(good.is_well_formed());
    }

    #[test]
    fn detects_spoofed_identity_fields() {
        let raw = json!({"topic": "tool.invoke.echo", "correlation": "c1", "arguments": {}, "source": "evil"});
        assert_eq!(spoofed_identity_field(&raw), Some("source"));

        let clean = json!({"topic": "tool.invoke.echo", "correlation": "c1", "arguments": {}});
        assert_eq!(spoofed_identity_field(&clean), None);
    }

    #[test]
    fn wire_message_deserializes_without_identity_fields() {
        let raw = json!({"topic": "tool.invoke.echo", "correlation": "c1", "arguments": {"text": "hi"}});
        let msg: WireMessage = serde_json::from_value(raw).unwrap();
        assert_eq!(msg.topic, "tool.invoke.echo");
        assert_eq!(msg.correlation.as_deref(), Some("c1"));
    }
}
