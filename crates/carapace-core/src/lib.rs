//! Carapace Core — foundation types shared by every other Carapace crate.
//!
//! This crate owns the wire-level vocabulary described by the protocol:
//! the [`Envelope`] (and its six core identity fields), the client-supplied
//! [`WireMessage`], the [`Topic`] grammar, the closed [`ErrorCode`] set, and
//! the small identifier newtypes (`SessionId`, `GroupId`, `CorrelationId`,
//! `ConfirmationId`) used across the pipeline.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]

pub mod envelope;
pub mod error;
pub mod ids;
pub mod prelude;
pub mod risk;
pub mod timestamp;
pub mod topic;

pub use envelope::{Envelope, EnvelopeKind, ResponsePayload, WireMessage};
pub use error::{ErrorCode, ErrorPayload};
pub use ids::{ConfirmationId, CorrelationId, EnvelopeId, GroupId, SessionId};
pub use risk::RiskLevel;
pub use timestamp::Timestamp;
pub use topic::{Topic, TopicParseError};
