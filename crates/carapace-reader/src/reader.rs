//! The per-container reader task: readline -> parse -> (optional
//! sanitise) -> envelope -> publish -> (optional) resume-token save
//! . A dedicated task owning its own `seq` counter, per the
//! retrieved pack's stateful-actor pattern for ordered stream
//! processing.

use crate::parser::{parse_line, ParseError, ParsedEvent};
use carapace_audit::ResumeTokenStore;
use carapace_core::{GroupId, Topic};
use carapace_events::{CarapaceEvent, EventBus};
use carapace_sanitize::Sanitizer;
use chrono::Utc;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, warn};
use uuid::Uuid;

/// Reader termination failure (: "propagate the error to the
/// manager, which marks the container dead"). Normal EOF is not an
/// error and is not represented here.
#[derive(Debug, thiserror::Error)]
pub enum ReaderError {
    /// The underlying stdout stream returned an IO error mid-read.
    #[error("container stdout stream failed: {0}")]
    Stream(#[source] std::io::Error),
}

/// Reads one container's NDJSON stdout stream and publishes the
/// `response.*` events it parses out of it.
pub struct ContainerOutputReader {
    container_id: String,
    group: GroupId,
    bus: Arc<EventBus>,
    resume: Option<Arc<ResumeTokenStore>>,
    sanitizer: Option<Sanitizer>,
    seq: AtomicU64,
}

impl ContainerOutputReader {
    /// Build a reader for `container_id`, publishing onto `bus` under
    /// `group`. Resume-token persistence and defense-in-depth
    /// sanitisation are both optional and attached via the builder
    /// methods below.
    #[must_use]
    pub fn new(container_id: impl Into<String>, group: GroupId, bus: Arc<EventBus>) -> Self {
        Self { container_id: container_id.into(), group, bus, resume: None, sanitizer: None, seq: AtomicU64::new(1) }
    }

    /// Persist `response.system`/`response.end` session ids to `store`.
    #[must_use]
    pub fn with_resume_store(mut self, store: Arc<ResumeTokenStore>) -> Self {
        self.resume = Some(store);
        self
    }

    /// Scan every published payload for credential-shaped strings
    /// before it reaches the bus.
    #[must_use]
    pub fn with_sanitizer(mut self, sanitizer: Sanitizer) -> Self {
        self.sanitizer = Some(sanitizer);
        self
    }

    /// Drive the reader to completion, one line at a time, until clean
    /// EOF (returns `Ok(())`) or a stream IO error (emits a final
    /// `response.error` and returns `Err`).
    pub async fn run<R: AsyncBufRead + Unpin>(self, mut stream: R) -> Result<(), ReaderError> {
        let mut line = String::new();
        loop {
            line.clear();
            match stream.read_line(&mut line).await {
                Ok(0) => return Ok(()),
                Ok(_) => {
                    let text = line.trim_end_matches(['\n', '\r']);
                    self.handle_line(text);
                },
                Err(err) => {
                    self.publish_error(err.to_string());
                    return Err(ReaderError::Stream(err));
                },
            }
        }
    }

    fn handle_line(&self, text: &str) {
        match parse_line(text) {
            Ok(Some(event)) => self.publish_parsed(event),
            Ok(None) => {},
            Err(ParseError::EmptyLine) => self.publish_error("malformed JSON: empty line"),
            Err(ParseError::TooLarge) => self.publish_error("line too large"),
            Err(ParseError::InvalidJson(reason)) => self.publish_error(format!("malformed JSON: {reason}")),
        }
    }

    fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::Relaxed)
    }

    fn publish_parsed(&self, event: ParsedEvent) {
        let seq = self.next_seq();
        let (topic, payload, claude_session_id) = match event {
            ParsedEvent::System { claude_session_id, model, raw } => (                "response.system",
                json!({"claudeSessionId": claude_session_id, "model": model, "raw": raw, "seq": seq}),
                claude_session_id,
),
            ParsedEvent::ToolCall { tool_name, tool_input, raw } => (                "response.tool_call",
                json!({"toolName": tool_name, "toolInput": tool_input, "raw": raw, "seq": seq}),
                None,
),
            ParsedEvent::Chunk { text, raw } => {
                ("response.chunk", json!({"text": text, "raw": raw, "seq": seq}), None)
            },
            ParsedEvent::ToolResult { tool_name, success, duration_ms, raw } => (                "response.tool_result",
                json!({"toolName": tool_name, "success": success, "durationMs": duration_ms, "raw": raw, "seq": seq}),
                None,
),
            ParsedEvent::End { claude_session_id, exit_code, usage, cost, raw } => (                "response.end",
                json!({
                    "claudeSessionId": claude_session_id,
                    "exitCode": exit_code,
                    "usage": usage,
                    "cost": cost,
                    "raw": raw,
                    "seq": seq,
                }),
                claude_session_id,
),
        };

        self.publish(Topic::Fixed(topic), payload);
        if let Some(id) = claude_session_id {
            self.save_resume_token(id);
        }
    }

    fn publish_error(&self, reason: impl Into<String>) {
        self.publish(Topic::Fixed("response.error"), json!({"reason": reason.into()}));
    }

    fn publish(&self, topic: Topic, payload: Value) {
        let payload = match &self.sanitizer {
            Some(sanitizer) => {
                let (redacted, touched) = sanitizer.sanitize(&payload);
                if !touched.is_empty() {
                    debug!(container = %self.container_id, paths = ?touched, "redacted container output");
                }
                redacted
            },
            None => payload,
        };
        self.bus.publish(CarapaceEvent::new(topic, self.container_id.clone(), self.group.clone(), payload));
    }

    fn save_resume_token(&self, claude_session_id: String) {
        let Ok(id) = Uuid::parse_str(&claude_session_id) else { return };
        let Some(store) = self.resume.clone() else { return };
        let group = self.group.clone();
        let now = Utc::now().timestamp();
        tokio::spawn(async move {
            if let Err(err) = store.save(group, id, now).await {
                warn!(error = %err, "failed to persist resume token");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn reader(bus: Arc<EventBus>) -> ContainerOutputReader {
        ContainerOutputReader::new("container-1", GroupId::new("g"), bus)
    }

    #[tokio::test]
    async fn publishes_a_response_event_per_known_line() {
        let bus = Arc::new(EventBus::new());
        let mut rx = bus.subscribe();
        let input = Cursor::new(b"{\"type\":\"system\",\"claudeSessionId\":\"s1\"}\n".to_vec());

        reader(Arc::clone(&bus)).run(input).await.unwrap();

        let event = rx.recv().await.unwrap();
        assert_eq!(event.topic, Topic::Fixed("response.system"));
    }

    #[tokio::test]
    async fn seq_is_monotonic_across_known_lines_only() {
        let bus = Arc::new(EventBus::new());
        let mut rx = bus.subscribe();
        let input = Cursor::new(            b"{\"type\":\"ping\"}\n{\"type\":\"system\",\"claudeSessionId\":\"s1\"}\n{\"type\":\"result\",\"claudeSessionId\":\"s1\"}\n"
                .to_vec(),
);

        reader(Arc::clone(&bus)).run(input).await.unwrap();

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!(first.envelope.payload.get("seq"), Some(&json!(1)));
        assert_eq!(second.envelope.payload.get("seq"), Some(&json!(2)));
    }

    #[tokio::test]
    async fn malformed_line_emits_inline_response_error_and_continues() {
        let bus = Arc::new(EventBus::new());
        let mut rx = bus.subscribe();
        let input = Cursor::new(b"not json\n{\"type\":\"system\",\"claudeSessionId\":\"s1\"}\n".to_vec());

        reader(Arc::clone(&bus)).run(input).await.unwrap();

        let first = rx.recv().await.unwrap();
        assert_eq!(first.topic, Topic::Fixed("response.error"));
        let second = rx.recv().await.unwrap();
        assert_eq!(second.topic, Topic::Fixed("response.system"));
    }

    #[tokio::test]
    async fn clean_eof_closes_quietly() {
        let bus = Arc::new(EventBus::new());
        let input = Cursor::new(Vec::new());
        assert!(reader(bus).run(input).await.is_ok());
    }

    #[tokio::test]
    async fn system_event_persists_a_resume_token() {
        let bus = Arc::new(EventBus::new());
        let store = Arc::new(ResumeTokenStore::open_in_memory().unwrap());
        let session_id = Uuid::new_v4();
        let input = Cursor::new(format!("{{\"type\":\"system\",\"claudeSessionId\":\"{session_id}\"}}\n").into_bytes());

        reader(Arc::clone(&bus)).with_resume_store(Arc::clone(&store)).run(input).await.unwrap();
        // resume persistence happens on a spawned task; give it a turn.
        tokio::task::yield_now().await;
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;

        let tokens = store.list(GroupId::new("g")).await.unwrap();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].claude_session_id, session_id);
    }

    #[tokio::test]
    async fn sanitizer_redacts_credential_shaped_strings_in_chunks() {
        let bus = Arc::new(EventBus::new());
        let mut rx = bus.subscribe();
        let line = json!({
            "type": "assistant",
            "message": {"content": [{"type": "text", "text": "token: Bearer abcdefghijklmnopqrstuvwxyz012345"}]},
        })
        .to_string();
        let input = Cursor::new(format!("{line}\n").into_bytes());

        reader(Arc::clone(&bus)).with_sanitizer(Sanitizer::new()).run(input).await.unwrap();

        let event = rx.recv().await.unwrap();
        let text = event.envelope.payload.get("text").and_then(Value::as_str).unwrap();
        assert!(text.contains("[REDACTED]"));
        assert!(!text.contains("abcdefghijklmnopqrstuvwxyz012345"));
    }
}
