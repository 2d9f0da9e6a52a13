//! Convenience re-exports for downstream crates.

pub use crate::envelope::{Envelope, EnvelopeKind, ResponsePayload, WireMessage};
pub use crate::error::{ErrorCode, ErrorPayload};
pub use crate::ids::{ConfirmationId, CorrelationId, EnvelopeId, GroupId, SessionId};
pub use crate::risk::RiskLevel;
pub use crate::timestamp::Timestamp;
pub use crate::topic::{Topic, TopicParseError};
