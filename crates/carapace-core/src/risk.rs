//! Tool risk classification.

use serde::{Deserialize, Serialize};

/// Risk level declared by a tool, driving the confirmation stage .
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    /// No confirmation required.
    Low,
    /// Requires confirmation unless pre-approved.
    Medium,
    /// Requires confirmation unless pre-approved.
    High,
}

impl RiskLevel {
    /// Whether this risk level requires the confirmation stage.
    #[must_use]
    pub fn requires_confirmation(self) -> bool {
        matches!(self, Self::Medium | Self::High)
    }
}
