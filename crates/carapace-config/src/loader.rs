//! Single-file TOML loading. No precedence/layering: config-file
//! discovery and merging across system/user/workspace locations is an
//! external-collaborator concern (`spec.md` 's CLI front-end);
//! this crate only turns one TOML document into a validated
//! [`CarapaceConfig`].

use crate::error::ConfigError;
use crate::types::CarapaceConfig;
use crate::validate::validate;
use std::path::Path;

impl CarapaceConfig {
    /// Parse and validate a config file at `path`. Defaults fill in any
    /// section the file omits entirely.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] if the file cannot be read,
    /// [`ConfigError::Parse`] if it is not valid TOML or does not match
    /// the schema, or [`ConfigError::Invalid`] if it fails semantic
    /// validation.
    pub fn load_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        Self::load_str(&text).map_err(|err| match err {
            ConfigError::Parse { source, .. } => ConfigError::Parse { path: path.to_path_buf(), source },
            other => other,
        })
    }

    /// Parse and validate a config document already in memory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] if `text` is not valid TOML or
    /// does not match the schema, or [`ConfigError::Invalid`] if it
    /// fails semantic validation.
    pub fn load_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)
            .map_err(|source| ConfigError::Parse { path: std::path::PathBuf::new(), source })?;
        validate(&config)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config = CarapaceConfig::load_str("").unwrap();
        assert_eq!(config.session_cap_per_group, 3);
        assert_eq!(config.container.runtime, "docker");
    }

    #[test]
    fn partial_section_keeps_remaining_defaults() {
        let config = CarapaceConfig::load_str("[rate_limit]\nburst_size = 50\n").unwrap();
        assert_eq!(config.rate_limit.burst_size, 50);
        assert_eq!(config.rate_limit.requests_per_minute, 60);
    }

    #[test]
    fn invalid_toml_is_rejected() {
        assert!(matches!(CarapaceConfig::load_str("not = [valid"), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn structurally_valid_but_semantically_invalid_is_rejected() {
        let err = CarapaceConfig::load_str("session_cap_per_group = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn load_file_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("carapace.toml");
        std::fs::write(&path, "home = \"/tmp/carapace-home\"\n").unwrap();

        let config = CarapaceConfig::load_file(&path).unwrap();
        assert_eq!(config.home, std::path::PathBuf::from("/tmp/carapace-home"));
    }

    #[test]
    fn load_file_missing_path_is_a_read_error() {
        let err = CarapaceConfig::load_file(Path::new("/does/not/exist.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn groups_and_plugin_roots_parse() {
        let text = r#"
            plugin_roots = ["/opt/carapace/plugins"]

            [groups.acme]
            image = "acme/agent:latest"
            cap = 2
        "#;
        let config = CarapaceConfig::load_str(text).unwrap();
        assert_eq!(config.plugin_roots, vec![std::path::PathBuf::from("/opt/carapace/plugins")]);
        assert_eq!(config.groups["acme"].cap, 2);
    }
}
