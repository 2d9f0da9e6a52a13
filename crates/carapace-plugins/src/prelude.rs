//! Convenience re-exports.

pub use crate::error::PluginError;
pub use crate::handler::{PluginHandler, PluginServices};
pub use crate::loader::{LoadedPlugin, PluginLoader};
pub use crate::manifest::{PluginManifest, ToolManifestEntry};
