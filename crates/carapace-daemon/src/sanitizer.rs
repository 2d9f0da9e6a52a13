//! Builds the container-output [`Sanitizer`] from configuration.

use carapace_config::SanitizerSettings;
use carapace_sanitize::{default_patterns, SanitizePattern, Sanitizer};
use regex::Regex;

/// Build a sanitizer honoring `settings.enabled` and layering any
/// operator-supplied `extra_patterns` on top of the built-in inventory.
///
/// Extra patterns are validated at config-load time
/// (`carapace_config::validate`), so `Regex::new` here is expected to
/// succeed; a pattern that somehow still fails to compile is skipped
/// rather than panicking the daemon.
#[must_use]
pub fn build(settings: &SanitizerSettings) -> Option<Sanitizer> {
    if !settings.enabled {
        return None;
    }

    let mut patterns = default_patterns();
    for extra in &settings.extra_patterns {
        let Ok(regex) = Regex::new(&extra.pattern) else {
            tracing::warn!(name = %extra.name, "sanitizer pattern failed to compile at startup, skipping");
            continue;
        };
        // `SanitizePattern::name`/`replacement` are `&'static str`; these
        // come from an owned config struct read once at startup, so
        // leaking them for the process lifetime is the same tradeoff the
        // built-in inventory makes with string literals.
        let name: &'static str = Box::leak(extra.name.clone().into_boxed_str());
        let replacement: &'static str = Box::leak(extra.replacement.clone().into_boxed_str());
        patterns.push(SanitizePattern { name, regex, replacement });
    }

    Some(Sanitizer::with_patterns(patterns))
}
