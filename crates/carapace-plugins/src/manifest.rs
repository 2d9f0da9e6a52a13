//! The `plugin.toml` manifest shape: a bundle's declared tools plus
//! bookkeeping metadata .

use carapace_core::RiskLevel;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One plugin bundle's manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginManifest {
    /// Human-readable plugin name (diagnostics only; not a catalog key).
    pub name: String,
    /// Free-form version string.
    #[serde(default)]
    pub version: Option<String>,
    /// Free-form description.
    #[serde(default)]
    pub description: Option<String>,
    /// The tools this bundle declares.
    #[serde(default)]
    pub tools: Vec<ToolManifestEntry>,
}

/// One tool declaration inside a plugin manifest, mirroring
/// `carapace_catalog::ToolDeclaration` in TOML-friendly form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolManifestEntry {
    /// Tool name (: must match the tool-name regex and avoid the
    /// reserved set).
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Risk level, lower-cased in TOML (`low` | `medium` | `high`).
    pub risk_level: RiskLevel,
    /// The tool's arguments schema (complexity budget).
    pub arguments_schema: Value,
    /// Groups allowed to invoke this tool; `None` means every group.
    #[serde(default)]
    pub allowed_groups: Option<Vec<String>>,
}
