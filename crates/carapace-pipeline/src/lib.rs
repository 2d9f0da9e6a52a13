//! Carapace Pipeline — the six-stage request pipeline (parse, lookup,
//! validate, authorise, confirm, dispatch) that answers every frame
//! arriving on the ROUTER socket, plus the session-claim handshake that
//! precedes it.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]

pub mod builtin;
pub mod config;
pub mod correlation;
pub mod error;
pub mod pipeline;
pub mod prelude;
pub mod preapproval;

pub use config::{PipelineConfig, DEFAULT_HANDLER_TIMEOUT};
pub use error::PipelineError;
pub use pipeline::{RequestPipeline, SOURCE};
pub use preapproval::PreapprovalSet;
