//! Topic grammar : a closed set of fixed topics plus the open
//! `tool.invoke.<name>` family.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Regex a tool name must match . Anchored, bounded, no
/// backtracking hazard.
pub static TOOL_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z][a-z0-9_]{0,62}$").expect("static regex is valid"));

/// Reserved tool names that can never be registered .
pub const RESERVED_TOOL_NAMES: &[&str] =
    &["get_diagnostics", "list_tools", "get_session_info"];

const FIXED_TOPICS: &[&str] = &[
    "message.inbound",
    "agent.started",
    "agent.completed",
    "agent.error",
    "task.created",
    "task.triggered",
    "plugin.ready",
    "plugin.stopping",
    "response.system",
    "response.chunk",
    "response.tool_call",
    "response.tool_result",
    "response.end",
    "response.error",
];

/// A dotted topic string drawn from the closed set described in `spec.md`
/// , or the open `tool.invoke.<name>` family.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Topic {
    /// One of the fixed, enumerated topics.
    Fixed(&'static str),
    /// `tool.invoke.<name>`, where `<name>` matched [`TOOL_NAME_RE`].
    ToolInvoke(String),
}

/// Error returned when a string does not match the topic grammar.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TopicParseError {
    /// The string was not a recognised fixed topic and did not match the
    /// `tool.invoke.<name>` shape.
    #[error("unrecognised topic: {0}")]
    Unrecognised(String),
    /// The string had the `tool.invoke.` prefix but the suffix failed the
    /// tool-name regex.
    #[error("invalid tool name in topic: {0}")]
    InvalidToolName(String),
}

impl Topic {
    /// Parse a raw topic string against the grammar.
    pub fn parse(raw: &str) -> Result<Self, TopicParseError> {
        if let Some(fixed) = FIXED_TOPICS.iter().find(|t| **t == raw) {
            return Ok(Self::Fixed(fixed));
        }
        if let Some(name) = raw.strip_prefix("tool.invoke.") {
            if TOOL_NAME_RE.is_match(name) {
                return Ok(Self::ToolInvoke(name.to_string()));
            }
            return Err(TopicParseError::InvalidToolName(raw.to_string()));
        }
        Err(TopicParseError::Unrecognised(raw.to_string()))
    }

    /// The tool name, if this is a `tool.invoke.<name>` topic.
    #[must_use]
    pub fn tool_name(&self) -> Option<&str> {
        match self {
            Self::ToolInvoke(name) => Some(name),
            Self::Fixed(_) => None,
        }
    }

    /// Render back to the dotted wire form.
    #[must_use]
    pub fn as_str(&self) -> String {
        match self {
            Self::Fixed(s) => (*s).to_string(),
            Self::ToolInvoke(name) => format!("tool.invoke.{name}"),
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<String> for Topic {
    type Error = TopicParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Topic> for String {
    fn from(topic: Topic) -> Self {
        topic.as_str()
    }
}

/// Validate a standalone tool name (not wrapped in a topic) against the
/// same regex and reserved set used for `tool.invoke.<name>` topics.
#[must_use]
pub fn is_valid_tool_name(name: &str) -> bool {
    TOOL_NAME_RE.is_match(name) && !RESERVED_TOOL_NAMES.contains(&name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_fixed_topics() {
        assert_eq!(Topic::parse("message.inbound").unwrap(), Topic::Fixed("message.inbound"));
        assert_eq!(Topic::parse("response.end").unwrap(), Topic::Fixed("response.end"));
    }

    #[test]
    fn parses_tool_invoke() {
        let topic = Topic::parse("tool.invoke.read_file").unwrap();
        assert_eq!(topic.tool_name(), Some("read_file"));
        assert_eq!(topic.as_str(), "tool.invoke.read_file");
    }

    #[test]
    fn rejects_bad_tool_name_suffix() {
        assert!(matches!(            Topic::parse("tool.invoke.Read-File"),
            Err(TopicParseError::InvalidToolName(_))
));
    }

    #[test]
    fn rejects_unknown_topic() {
        assert!(matches!(            Topic::parse("totally.unknown"),
            Err(TopicParseError::Unrecognised(_))
));
    }

    #[test]
    fn reserved_names_are_invalid() {
        assert!(!is_valid_tool_name("list_tools"));
        assert!(is_valid_tool_name("read_file"));
    }

    #[test]
    fn name_length_boundary() {
        let max_len = "a".to_string() + &"b".repeat(62);
        assert_eq!(max_len.len(), 63);
        assert!(TOOL_NAME_RE.is_match(&max_len));
        let too_long = max_len + "c";
        assert!(!TOOL_NAME_RE.is_match(&too_long));
    }
}
