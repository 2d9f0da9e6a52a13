//! Plugin loader failure categories : `invalid_manifest`,
//! `missing_handler`, `init_error`, `timeout`, `collision`.

use std::path::PathBuf;
use thiserror::Error;

/// Failure loading or running a plugin bundle.
#[derive(Debug, Error)]
pub enum PluginError {
    /// The manifest file could not be read.
    #[error("failed to read manifest {path}: {message}")]
    ManifestReadFailed {
        /// Manifest path.
        path: PathBuf,
        /// Underlying IO error text.
        message: String,
    },
    /// The manifest did not parse as valid TOML, or a declared tool
    /// failed the  schema-complexity budget.
    #[error("invalid manifest {path}: {message}")]
    InvalidManifest {
        /// Manifest path.
        path: PathBuf,
        /// Why the manifest was rejected.
        message: String,
    },
    /// The bundle declared no handler entry point.
    #[error("plugin {name} declares no handler")]
    MissingHandler {
        /// Plugin name.
        name: String,
    },
    /// A declared tool name collided with one already in the catalog,
    /// or with another tool in the same manifest.
    #[error("tool '{name}' from plugin {plugin} collides with an existing registration")]
    Collision {
        /// Plugin name.
        plugin: String,
        /// Offending tool name.
        name: String,
    },
    /// `initialize`/`shutdown` raised a structured error.
    #[error("plugin {name} {phase} failed: {message}")]
    InitError {
        /// Plugin name.
        name: String,
        /// `"initialize"` or `"shutdown"`.
        phase: &'static str,
        /// Underlying error text.
        message: String,
    },
    /// `initialize`/`shutdown` did not complete within its deadline.
    #[error("plugin {name} {phase} timed out")]
    Timeout {
        /// Plugin name.
        name: String,
        /// `"initialize"` or `"shutdown"`.
        phase: &'static str,
    },
}
