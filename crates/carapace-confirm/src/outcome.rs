//! Confirmation outcomes .

/// How a pending confirmation was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationOutcome {
    /// The operator approved the action.
    Approved,
    /// The operator explicitly denied the action.
    Denied,
    /// No decision arrived before the timeout (or the gate was
    /// cancelled/shut down), which is resolved identically to a timeout.
    TimedOut,
}

impl ConfirmationOutcome {
    /// Whether the confirmation permits dispatch to proceed.
    #[must_use]
    pub fn approved(self) -> bool {
        matches!(self, Self::Approved)
    }

    /// The `reason` string carried on a denial, matching `"denied"|"timeout"`.
    #[must_use]
    pub fn reason(self) -> Option<&'static str> {
        match self {
            Self::Approved => None,
            Self::Denied => Some("denied"),
            Self::TimedOut => Some("timeout"),
        }
    }
}
