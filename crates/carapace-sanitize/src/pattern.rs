//! Credential-pattern inventory .

use regex::Regex;

/// A single redaction rule: a bounded, anchored regex and a label used
/// only in logging/diagnostics.
#[derive(Clone)]
pub struct SanitizePattern {
    /// Name for diagnostics, e.g. `"bearer_token"`.
    pub name: &'static str,
    /// Compiled pattern. Every built-in pattern is bounded (no
    /// unbounded `.*`) to keep matching cheap and non-backtracking.
    pub regex: Regex,
    /// Replacement template passed to `Regex::replace_all`. Capture
    /// groups (`${1}`, `${2}`, ...) let a pattern keep surrounding
    /// syntax (e.g. the quotes around a JSON string value) while
    /// redacting only the credential itself.
    pub replacement: &'static str,
}

impl std::fmt::Debug for SanitizePattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SanitizePattern").field("name", &self.name).finish()
    }
}

fn compiled(name: &'static str, pattern: &str) -> SanitizePattern {
    with_replacement(name, pattern, "[REDACTED]")
}

fn with_replacement(name: &'static str, pattern: &str, replacement: &'static str) -> SanitizePattern {
    SanitizePattern {
        name,
        regex: Regex::new(pattern).expect("built-in sanitizer pattern is valid regex"),
        replacement,
    }
}

/// The default pattern inventory: bearer tokens, common vendor API-key
/// prefixes, AWS access key ids, GitHub tokens, and generic
/// high-entropy blobs sitting next to a credential-shaped key name.
#[must_use]
pub fn default_patterns() -> Vec<SanitizePattern> {
    vec![
        compiled("bearer_token", r"(?i)\bBearer\s+[A-Za-z0-9\-_\.=]{8,200}\b"),
        compiled("openai_style_secret", r"\bsk-[A-Za-z0-9]{20,100}\b"),
        compiled("github_token", r"\bgh[pousr]_[A-Za-z0-9]{20,100}\b"),
        compiled("aws_access_key_id", r"\bAKIA[0-9A-Z]{16}\b"),
        with_replacement(            "credential_like_hex_or_base64",
            r#"(?i)("(?:api[_-]?key|secret|token|password)"\s*:\s*")[A-Za-z0-9+/_\-]{20,200}(")"#,
            "${1}[REDACTED]${2}",
),
    ]
}
