//! Plugin bundle discovery: walk configured plugin roots for
//! `plugin.toml` manifests, one per bundle directory (mirroring
//! the retrieved pack's `HOOK.toml`/`hook.toml` discovery convention).

use crate::error::PluginError;
use crate::manifest::PluginManifest;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Manifest file names recognised inside a bundle directory.
pub const PLUGIN_FILE_NAMES: &[&str] = &["plugin.toml", "Plugin.toml"];

/// Walk every directory in `roots`, returning a `(bundle_dir, manifest)`
/// pair for each subdirectory that contains a recognised manifest file.
/// A root or bundle directory that cannot be read is logged and
/// skipped rather than aborting the whole walk.
pub fn discover_plugins(roots: &[PathBuf]) -> Vec<(PathBuf, PluginManifest)> {
    let mut found = Vec::new();
    for root in roots {
        if !root.exists() {
            continue;
        }
        match load_manifests_from_dir(root) {
            Ok(manifests) => found.extend(manifests),
            Err(err) => warn!(root = %root.display(), error = %err, "failed to discover plugins"),
        }
    }
    info!(count = found.len(), "discovered plugin bundles");
    found
}

fn load_manifests_from_dir(dir: &Path) -> Result<Vec<(PathBuf, PluginManifest)>, PluginError> {
    let entries = std::fs::read_dir(dir).map_err(|err| PluginError::ManifestReadFailed {
        path: dir.to_path_buf(),
        message: err.to_string(),
    })?;

    let mut found = Vec::new();
    for entry in entries {
        let Ok(entry) = entry else { continue };
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        for file_name in PLUGIN_FILE_NAMES {
            let manifest_path = path.join(file_name);
            if !manifest_path.exists() {
                continue;
            }
            match load_manifest(&manifest_path) {
                Ok(manifest) => {
                    debug!(path = %manifest_path.display(), "loaded plugin manifest");
                    found.push((path.clone(), manifest));
                },
                Err(err) => warn!(path = %manifest_path.display(), error = %err, "failed to load plugin manifest"),
            }
            break;
        }
    }
    Ok(found)
}

fn load_manifest(path: &Path) -> Result<PluginManifest, PluginError> {
    let content = std::fs::read_to_string(path)
        .map_err(|err| PluginError::ManifestReadFailed { path: path.to_path_buf(), message: err.to_string() })?;
    toml::from_str(&content)
        .map_err(|err| PluginError::InvalidManifest { path: path.to_path_buf(), message: err.to_string() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_manifest(dir: &Path, body: &str) {
        fs::write(dir.join("plugin.toml"), body).unwrap();
    }

    #[test]
    fn discovers_a_bundle_with_a_valid_manifest() {
        let root = tempfile::tempdir().unwrap();
        let bundle = root.path().join("my-plugin");
        fs::create_dir(&bundle).unwrap();
        write_manifest(            &bundle,
            r#"
            name = "my-plugin"

            [[tools]]
            name = "read_file"
            description = "reads a file"
            risk_level = "low"
            arguments_schema = { type = "object", additionalProperties = false }
            "#,
);

        let found = discover_plugins(&[root.path().to_path_buf()]);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].1.name, "my-plugin");
        assert_eq!(found[0].1.tools.len(), 1);
    }

    #[test]
    fn skips_bundles_without_a_manifest() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir(root.path().join("not-a-plugin")).unwrap();

        assert!(discover_plugins(&[root.path().to_path_buf()]).is_empty());
    }

    #[test]
    fn continues_past_an_unparseable_manifest() {
        let root = tempfile::tempdir().unwrap();
        let good = root.path().join("good-plugin");
        let bad = root.path().join("bad-plugin");
        fs::create_dir(&good).unwrap();
        fs::create_dir(&bad).unwrap();
        write_manifest(&good, r#"name = "good-plugin""#);
        write_manifest(&bad, "not valid toml {{{");

        let found = discover_plugins(&[root.path().to_path_buf()]);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].1.name, "good-plugin");
    }

    #[test]
    fn nonexistent_root_is_skipped_not_fatal() {
        assert!(discover_plugins(&[PathBuf::from("/does/not/exist")]).is_empty());
    }
}
