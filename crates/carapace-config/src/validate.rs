//! Semantic validation beyond what `serde`/`toml` enforce structurally.

use crate::error::ConfigError;
use crate::types::CarapaceConfig;

/// Validate a parsed configuration. Called by every loader entry point;
/// also safe to call directly against a value built programmatically
/// (e.g. in tests).
///
/// # Errors
///
/// Returns [`ConfigError::Invalid`] describing the first violation
/// found.
pub fn validate(config: &CarapaceConfig) -> Result<(), ConfigError> {
    if config.home.as_os_str().is_empty() {
        return Err(ConfigError::Invalid("home must not be empty".to_string()));
    }
    if config.session_cap_per_group == 0 {
        return Err(ConfigError::Invalid("session_cap_per_group must be at least 1".to_string()));
    }
    if config.handler_timeout_secs == 0 {
        return Err(ConfigError::Invalid("handler_timeout_secs must be at least 1".to_string()));
    }
    if config.confirmation_timeout_secs == 0 {
        return Err(ConfigError::Invalid("confirmation_timeout_secs must be at least 1".to_string()));
    }
    if config.rate_limit.burst_size == 0 {
        return Err(ConfigError::Invalid("rate_limit.burst_size must be at least 1".to_string()));
    }
    match config.container.runtime.as_str() {
        "docker" | "podman" => {},
        other => {
            return Err(ConfigError::Invalid(format!(                "container.runtime must be 'docker' or 'podman', got '{other}'"
)))
        },
    }
    if config.container.spawn_queue_cap == 0 {
        return Err(ConfigError::Invalid("container.spawn_queue_cap must be at least 1".to_string()));
    }

    for (name, group) in &config.groups {
        if group.cap == 0 {
            return Err(ConfigError::Invalid(format!("groups.{name}.cap must be at least 1")));
        }
        if group.image.is_empty() && config.container.default_image.is_empty() {
            return Err(ConfigError::Invalid(format!(                "groups.{name} has no image and container.default_image is empty"
)));
        }
    }

    for pattern in &config.sanitizer.extra_patterns {
        regex::Regex::new(&pattern.pattern).map_err(|err| {
            ConfigError::Invalid(format!("sanitizer pattern '{}' failed to compile: {err}", pattern.name))
        })?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{GroupSettings, SanitizePatternSettings};

    #[test]
    fn default_config_is_valid() {
        validate(&CarapaceConfig::default()).unwrap();
    }

    #[test]
    fn zero_session_cap_is_rejected() {
        let mut config = CarapaceConfig::default();
        config.session_cap_per_group = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn unknown_runtime_is_rejected() {
        let mut config = CarapaceConfig::default();
        config.container.runtime = "firecracker".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn group_with_zero_cap_is_rejected() {
        let mut config = CarapaceConfig::default();
        config.groups.insert("acme".to_string(), GroupSettings { cap: 0, ..GroupSettings::default() });
        assert!(validate(&config).is_err());
    }

    #[test]
    fn group_without_image_falls_back_to_default_image() {
        let mut config = CarapaceConfig::default();
        config.groups.insert("acme".to_string(), GroupSettings::default());
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn uncompilable_sanitizer_pattern_is_rejected() {
        let mut config = CarapaceConfig::default();
        config.sanitizer.extra_patterns.push(SanitizePatternSettings {
            name: "broken".to_string(),
            pattern: "(unclosed".to_string(),
            replacement: "[REDACTED]".to_string(),
        });
        assert!(validate(&config).is_err());
    }
}
