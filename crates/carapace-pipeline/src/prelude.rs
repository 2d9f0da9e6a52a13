//! Convenience re-exports for downstream crates.

pub use crate::config::PipelineConfig;
pub use crate::error::PipelineError;
pub use crate::pipeline::RequestPipeline;
pub use crate::preapproval::PreapprovalSet;
