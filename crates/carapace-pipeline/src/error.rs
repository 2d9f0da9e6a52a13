//! Pipeline-internal failures that don't fit neatly into a single stage's
//! [`carapace_core::ErrorCode`] on their own — mostly around the
//! session-claim handshake that happens ahead of stage 1 proper.

use thiserror::Error;

/// Failure establishing a session before the six-stage pipeline can run.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PipelineError {
    /// The connection has no bound session and the frame was not a
    /// `get_session_info` claim handshake.
    #[error("no session bound for this connection; expected a get_session_info claim")]
    NoSession,
    /// `get_session_info` was called without a well-formed `claim` argument.
    #[error("get_session_info requires a string 'claim' argument")]
    MalformedClaim,
    /// The presented claim token is unknown or already redeemed.
    #[error("claim token was not recognised")]
    UnknownClaim,
}
