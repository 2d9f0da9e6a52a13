//! Configuration loading and validation errors.

use thiserror::Error;

/// Failure loading or validating a [`crate::CarapaceConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Read {
        /// Path that failed to read.
        path: std::path::PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
    /// The config file was not valid TOML, or did not match the schema.
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        /// Path that failed to parse.
        path: std::path::PathBuf,
        /// Underlying TOML error.
        #[source]
        source: toml::de::Error,
    },
    /// The parsed configuration failed semantic validation.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
