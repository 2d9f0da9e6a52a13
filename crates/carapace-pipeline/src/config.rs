//! Tunables for the pipeline that aren't owned by any single sub-crate.

use std::time::Duration;

/// Default bound on how long stage 6 (Dispatch) waits for a handler .
pub const DEFAULT_HANDLER_TIMEOUT: Duration = Duration::from_secs(30);

/// Pipeline-level configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Per-call dispatch timeout (stage 6).
    pub handler_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self { handler_timeout: DEFAULT_HANDLER_TIMEOUT }
    }
}
