//! Convenience re-exports.

pub use crate::pattern::SanitizePattern;
pub use crate::sanitizer::Sanitizer;
