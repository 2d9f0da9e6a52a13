//! Short-lived pre-approval set ("Pre-approval"): lets a high-risk
//! invocation skip the confirm stage when an out-of-band channel has
//! already approved this exact correlation. Drained on use.

use carapace_core::CorrelationId;
use dashmap::DashSet;

/// Tracks correlation ids that are allowed to bypass the confirm stage.
#[derive(Default)]
pub struct PreapprovalSet {
    entries: DashSet<CorrelationId>,
}

impl PreapprovalSet {
    /// Construct an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a pre-approval for `correlation`, e.g. from an out-of-band
    /// confirmation channel.
    pub fn seed(&self, correlation: CorrelationId) {
        self.entries.insert(correlation);
    }

    /// Consume a pre-approval if present. Returns whether it was found
    /// (the entry is removed either way it's checked — "drained on use").
    pub fn take(&self, correlation: CorrelationId) -> bool {
        self.entries.remove(&correlation).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_consumes_a_seeded_entry_exactly_once() {
        let set = PreapprovalSet::new();
        let correlation = CorrelationId::new();
        set.seed(correlation);
        assert!(set.take(correlation));
        assert!(!set.take(correlation));
    }

    #[test]
    fn unseeded_correlation_is_not_preapproved() {
        let set = PreapprovalSet::new();
        assert!(!set.take(CorrelationId::new()));
    }
}
