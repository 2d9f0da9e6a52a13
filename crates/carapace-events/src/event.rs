//! The event shape carried on the internal bus and the PUB socket.

use carapace_core::{Envelope, EnvelopeKind, GroupId, Timestamp, Topic};
use serde::Serialize;
use serde_json::Value;

/// An envelope paired with the topic it was published under.
///
/// The PUB socket's wire framing is `(topic, payload)` : `topic` is
/// this struct's `topic` field rendered to its dotted string, and
/// `payload` is the serialized [`Envelope`] (whose own `payload` field
/// carries the topic-specific content). Serializes as the envelope's
/// fields flattened alongside `topic`.
#[derive(Debug, Clone, Serialize)]
pub struct CarapaceEvent {
    /// The topic this event was published under.
    pub topic: Topic,
    /// The envelope: six identity fields plus topic-specific payload.
    #[serde(flatten)]
    pub envelope: Envelope,
}

impl CarapaceEvent {
    /// Build an event, stamping a fresh envelope.
    #[must_use]
    pub fn new(topic: Topic, source: impl Into<String>, group: GroupId, payload: Value) -> Self {
        Self {
            envelope: Envelope::new(EnvelopeKind::Event, source, group, None, payload),
            topic,
        }
    }

    /// Shorthand accessor for the timestamp stamped on the envelope.
    #[must_use]
    pub fn timestamp(&self) -> Timestamp {
        self.envelope.timestamp()
    }
}
