//! NDJSON line parsing: one line in, one typed event (or a skip) out
//! (parser contract).

use serde_json::Value;

/// Lines larger than this fail with an inline `response.error`; the
/// stream continues .
pub const MAX_LINE_BYTES: usize = 1024 * 1024;

/// A successfully parsed container stdout line, routed to its
/// `response.*` shape.
#[derive(Debug, Clone)]
pub enum ParsedEvent {
    /// A `system` line.
    System {
        /// The upstream agent session id, if present and string-shaped.
        claude_session_id: Option<String>,
        /// Model identifier, if present.
        model: Option<String>,
        /// The original line, verbatim.
        raw: Value,
    },
    /// An `assistant` line whose content included a `tool_use` block.
    /// Wins over a text block when both are present in the same line.
    ToolCall {
        /// The invoked tool's name.
        tool_name: String,
        /// The tool's input, verbatim.
        tool_input: Value,
        /// The original line, verbatim.
        raw: Value,
    },
    /// An `assistant` line whose content was text block(s) with no
    /// `tool_use` block.
    Chunk {
        /// Every text block's content, concatenated in order.
        text: String,
        /// The original line, verbatim.
        raw: Value,
    },
    /// A `tool_result` line. Only structural metadata is kept; the
    /// result `content` is never copied into the event.
    ToolResult {
        /// The tool this result belongs to, if present.
        tool_name: Option<String>,
        /// `true` unless the line marked `is_error`.
        success: bool,
        /// Reported duration, if present.
        duration_ms: Option<u64>,
        /// The original line, verbatim.
        raw: Value,
    },
    /// A `result` line: the agent run has ended.
    End {
        /// The upstream agent session id, if present and string-shaped.
        claude_session_id: Option<String>,
        /// `1` if `is_error` was set, else `0`.
        exit_code: u8,
        /// Usage metadata, if present.
        usage: Option<Value>,
        /// Cost metadata, if present.
        cost: Option<Value>,
        /// The original line, verbatim.
        raw: Value,
    },
}

/// A line that could not be turned into an event at all (as opposed to
/// an unrecognised `type`, which is a silent skip, not an error).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// The line's byte length exceeded [`MAX_LINE_BYTES`].
    #[error("line too large")]
    TooLarge,
    /// The line was empty or whitespace-only.
    #[error("malformed JSON: empty line")]
    EmptyLine,
    /// The line was not valid JSON.
    #[error("malformed JSON: {0}")]
    InvalidJson(String),
}

/// Parse one NDJSON line. `Ok(None)` means the line parsed as JSON but
/// carried an unrecognised `type` (or no `type` at all) — silently
/// skipped, no event and no `seq` increment .
pub fn parse_line(line: &str) -> Result<Option<ParsedEvent>, ParseError> {
    if line.len() > MAX_LINE_BYTES {
        return Err(ParseError::TooLarge);
    }
    if line.trim().is_empty() {
        return Err(ParseError::EmptyLine);
    }

    let raw: Value = serde_json::from_str(line).map_err(|err| ParseError::InvalidJson(err.to_string()))?;
    let Some(kind) = raw.get("type").and_then(Value::as_str) else { return Ok(None) };

    Ok(match kind {
        "system" => Some(parse_system(raw)),
        "assistant" => parse_assistant(raw),
        "tool_result" => Some(parse_tool_result(raw)),
        "result" => Some(parse_result(raw)),
        _ => None,
    })
}

fn string_field(value: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| value.get(key).and_then(Value::as_str)).map(str::to_string)
}

const SESSION_ID_KEYS: &[&str] = &["claudeSessionId", "session_id", "sessionId"];

fn parse_system(raw: Value) -> ParsedEvent {
    let claude_session_id = string_field(&raw, SESSION_ID_KEYS);
    let model = string_field(&raw, &["model"]);
    ParsedEvent::System { claude_session_id, model, raw }
}

fn parse_assistant(raw: Value) -> Option<ParsedEvent> {
    let content = raw.get("message")?.get("content")?.as_array()?;

    if let Some(block) = content.iter().find(|b| b.get("type").and_then(Value::as_str) == Some("tool_use")) {
        let tool_name = string_field(block, &["name"]).unwrap_or_default();
        let tool_input = block.get("input").cloned().unwrap_or(Value::Null);
        return Some(ParsedEvent::ToolCall { tool_name, tool_input, raw });
    }

    let text: String = content
        .iter()
        .filter(|b| b.get("type").and_then(Value::as_str) == Some("text"))
        .filter_map(|b| b.get("text").and_then(Value::as_str))
        .collect();
    if text.is_empty() {
        return None;
    }
    Some(ParsedEvent::Chunk { text, raw })
}

fn parse_tool_result(raw: Value) -> ParsedEvent {
    let tool_name = string_field(&raw, &["toolName", "tool_name", "name"]);
    let is_error = raw.get("is_error").and_then(Value::as_bool).unwrap_or(false);
    let duration_ms =
        raw.get("duration_ms").and_then(Value::as_u64).or_else(|| raw.get("durationMs").and_then(Value::as_u64));
    ParsedEvent::ToolResult { tool_name, success: !is_error, duration_ms, raw }
}

fn parse_result(raw: Value) -> ParsedEvent {
    let claude_session_id = string_field(&raw, SESSION_ID_KEYS);
    let is_error = raw.get("is_error").and_then(Value::as_bool).unwrap_or(false);
    let usage = raw.get("usage").cloned();
    let cost = raw.get("cost").cloned();
    ParsedEvent::End { claude_session_id, exit_code: u8::from(is_error), usage, cost, raw }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_line_is_an_error() {
        assert_eq!(parse_line("   ").unwrap_err(), ParseError::EmptyLine);
        assert_eq!(parse_line("").unwrap_err(), ParseError::EmptyLine);
    }

    #[test]
    fn oversized_line_is_an_error() {
        let line = "a".repeat(MAX_LINE_BYTES + 1);
        assert_eq!(parse_line(&line).unwrap_err(), ParseError::TooLarge);
    }

    #[test]
    fn invalid_json_is_an_error() {
        assert!(matches!(parse_line("not json"), Err(ParseError::InvalidJson(_))));
    }

    #[test]
    fn unknown_type_is_silently_skipped() {
        let line = json!({"type": "ping"}).to_string();
        assert!(parse_line(&line).unwrap().is_none());
    }

    #[test]
    fn missing_type_is_silently_skipped() {
        let line = json!({"foo": "bar"}).to_string();
        assert!(parse_line(&line).unwrap().is_none());
    }

    #[test]
    fn parses_system_line() {
        let line = json!({"type": "system", "claudeSessionId": "abc-123", "model": "opus"}).to_string();
        let event = parse_line(&line).unwrap().unwrap();
        match event {
            ParsedEvent::System { claude_session_id, model, .. } => {
                assert_eq!(claude_session_id.as_deref(), Some("abc-123"));
                assert_eq!(model.as_deref(), Some("opus"));
            },
            other => panic!("expected System, got {other:?}"),
        }
    }

    #[test]
    fn tool_use_wins_over_text_in_assistant_line() {
        let line = json!({
            "type": "assistant",
            "message": {"content": [
                {"type": "text", "text": "thinking..."},
                {"type": "tool_use", "name": "read_file", "input": {"path": "/tmp/x"}},
            ]},
        })
        .to_string();
        let event = parse_line(&line).unwrap().unwrap();
        match event {
            ParsedEvent::ToolCall { tool_name, tool_input, .. } => {
                assert_eq!(tool_name, "read_file");
                assert_eq!(tool_input, json!({"path": "/tmp/x"}));
            },
            other => panic!("expected ToolCall, got {other:?}"),
        }
    }

    #[test]
    fn concatenates_multiple_text_blocks() {
        let line = json!({
            "type": "assistant",
            "message": {"content": [
                {"type": "text", "text": "hello "},
                {"type": "text", "text": "world"},
            ]},
        })
        .to_string();
        let event = parse_line(&line).unwrap().unwrap();
        match event {
            ParsedEvent::Chunk { text, .. } => assert_eq!(text, "hello world"),
            other => panic!("expected Chunk, got {other:?}"),
        }
    }

    #[test]
    fn assistant_line_with_no_text_or_tool_use_is_skipped() {
        let line = json!({"type": "assistant", "message": {"content": []}}).to_string();
        assert!(parse_line(&line).unwrap().is_none());
    }

    #[test]
    fn tool_result_drops_content_and_keeps_metadata() {
        let line = json!({
            "type": "tool_result",
            "toolName": "read_file",
            "is_error": false,
            "duration_ms": 42,
            "content": "this must never appear on the event",
        })
        .to_string();
        let event = parse_line(&line).unwrap().unwrap();
        match event {
            ParsedEvent::ToolResult { tool_name, success, duration_ms, .. } => {
                assert_eq!(tool_name.as_deref(), Some("read_file"));
                assert!(success);
                assert_eq!(duration_ms, Some(42));
            },
            other => panic!("expected ToolResult, got {other:?}"),
        }
    }

    #[test]
    fn tool_result_error_flips_success() {
        let line = json!({"type": "tool_result", "is_error": true}).to_string();
        let event = parse_line(&line).unwrap().unwrap();
        match event {
            ParsedEvent::ToolResult { success, .. } => assert!(!success),
            other => panic!("expected ToolResult, got {other:?}"),
        }
    }

    #[test]
    fn result_line_maps_exit_code() {
        let line = json!({"type": "result", "claudeSessionId": "s1", "is_error": true}).to_string();
        let event = parse_line(&line).unwrap().unwrap();
        match event {
            ParsedEvent::End { claude_session_id, exit_code, .. } => {
                assert_eq!(claude_session_id.as_deref(), Some("s1"));
                assert_eq!(exit_code, 1);
            },
            other => panic!("expected End, got {other:?}"),
        }
    }
}
