//! Carapace Sanitize — defense-in-depth credential redaction for
//! outbound event payloads.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]

pub mod pattern;
pub mod prelude;
pub mod sanitizer;

pub use pattern::{default_patterns, SanitizePattern};
pub use sanitizer::Sanitizer;
