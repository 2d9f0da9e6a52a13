//! The closed error-code set  and the wire-level error payload .

use serde::{Deserialize, Serialize};
use std::fmt;

/// Every failure a request can terminate with. Each pipeline stage emits
/// exactly one of these ; no other stage emits that code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Stage 2 (Lookup): tool name not found in the catalog.
    UnknownTool,
    /// Stage 1 (Parse) or 3 (Validate): malformed wire message or schema mismatch.
    ValidationFailed,
    /// Stage 4 (Authorise): session's group is not permitted for the tool.
    Unauthorized,
    /// Stage 4 (Authorise): rate limiter has no token available.
    RateLimited,
    /// Stage 5 (Confirm): confirmation timed out.
    ConfirmationTimeout,
    /// Stage 5 (Confirm): confirmation was explicitly denied.
    ConfirmationDenied,
    /// Stage 6 (Dispatch): handler did not respond within its deadline.
    PluginTimeout,
    /// Stage 6 (Dispatch): no handler registered for the tool.
    PluginUnavailable,
    /// Stage 6 (Dispatch): handler raised an unstructured error.
    PluginError,
    /// Stage 6 (Dispatch): handler returned a structured error.
    HandlerError,
}

impl ErrorCode {
    /// The pipeline stage index (1-6) that can emit this code .
    #[must_use]
    pub fn stage(self) -> u8 {
        match self {
            Self::UnknownTool => 2,
            Self::ValidationFailed => 3,
            Self::Unauthorized | Self::RateLimited => 4,
            Self::ConfirmationTimeout | Self::ConfirmationDenied => 5,
            Self::PluginTimeout | Self::PluginUnavailable | Self::PluginError | Self::HandlerError => 6,
        }
    }

    /// Whether the client should expect this error to resolve itself if
    /// retried verbatim .
    #[must_use]
    pub fn retriable_by_default(self) -> bool {
        matches!(self, Self::RateLimited | Self::ConfirmationTimeout | Self::PluginTimeout | Self::PluginUnavailable)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::UnknownTool => "UNKNOWN_TOOL",
            Self::ValidationFailed => "VALIDATION_FAILED",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::RateLimited => "RATE_LIMITED",
            Self::ConfirmationTimeout => "CONFIRMATION_TIMEOUT",
            Self::ConfirmationDenied => "CONFIRMATION_DENIED",
            Self::PluginTimeout => "PLUGIN_TIMEOUT",
            Self::PluginUnavailable => "PLUGIN_UNAVAILABLE",
            Self::PluginError => "PLUGIN_ERROR",
            Self::HandlerError => "HANDLER_ERROR",
        };
        write!(f, "{s}")
    }
}

/// The wire-level error payload : `{code, message, retriable, stage?,
/// field?, retry_after?}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorPayload {
    /// The closed error code.
    pub code: ErrorCode,
    /// Human-readable detail. Never includes raw tool arguments or results.
    pub message: String,
    /// Whether the caller should expect a retry to succeed.
    pub retriable: bool,
    /// Pipeline stage reached, if applicable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<u8>,
    /// Offending JSON-Schema field path, set only for `VALIDATION_FAILED`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// Seconds until a retry might succeed, set only for `RATE_LIMITED`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
}

impl ErrorPayload {
    /// Build a payload for a code, defaulting `retriable` and `stage` from
    /// the code itself.
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            retriable: code.retriable_by_default(),
            stage: Some(code.stage()),
            field: None,
            retry_after: None,
        }
    }

    /// Attach the offending field path (used for `VALIDATION_FAILED`).
    #[must_use]
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    /// Override the stage reached, for codes like `VALIDATION_FAILED` that
    /// can terminate more than one stage (1 or 3) per spec §6's table.
    #[must_use]
    pub fn with_stage(mut self, stage: u8) -> Self {
        self.stage = Some(stage);
        self
    }

    /// Attach a retry-after hint in seconds (used for `RATE_LIMITED`).
    #[must_use]
    pub fn with_retry_after(mut self, seconds: u64) -> Self {
        self.retry_after = Some(seconds);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_mapping_matches_spec_table() {
        assert_eq!(ErrorCode::UnknownTool.stage(), 2);
        assert_eq!(ErrorCode::ValidationFailed.stage(), 3);
        assert_eq!(ErrorCode::Unauthorized.stage(), 4);
        assert_eq!(ErrorCode::RateLimited.stage(), 4);
        assert_eq!(ErrorCode::ConfirmationTimeout.stage(), 5);
        assert_eq!(ErrorCode::ConfirmationDenied.stage(), 5);
        assert_eq!(ErrorCode::PluginTimeout.stage(), 6);
        assert_eq!(ErrorCode::HandlerError.stage(), 6);
    }

    #[test]
    fn retriable_defaults_match_spec_table() {
        assert!(ErrorCode::RateLimited.retriable_by_default());
        assert!(ErrorCode::ConfirmationTimeout.retriable_by_default());
        assert!(!ErrorCode::UnknownTool.retriable_by_default());
        assert!(!ErrorCode::ConfirmationDenied.retriable_by_default());
        assert!(!ErrorCode::HandlerError.retriable_by_default());
    }

    #[test]
    fn payload_serializes_screaming_snake_case() {
        let payload = ErrorPayload::new(ErrorCode::UnknownTool, "no such tool");
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["code"], "UNKNOWN_TOOL");
        assert_eq!(json["stage"], 2);
        assert!(json.get("field").is_none());
    }

    #[test]
    fn result_and_error_never_both_present() {
        // exercised structurally in carapace-pipeline; here we just check
        // the error payload never silently carries a result-shaped field.
        let payload = ErrorPayload::new(ErrorCode::ValidationFailed, "missing field").with_field("name");
        assert_eq!(payload.field.as_deref(), Some("name"));
    }
}
