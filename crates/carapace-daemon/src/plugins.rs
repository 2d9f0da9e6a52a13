//! Plugin bundle wiring: discovery plus handler construction.
//!
//! `carapace-plugins` discovers `plugin.toml` manifests and knows how
//! to register/initialize/shut down a handler once it has one, but
//! turning a discovered bundle into a live `Arc<dyn PluginHandler>` is
//! left to the embedder — a manifest alone doesn't say how its process
//! is started or what in-process type backs it. [`PluginHandlerFactory`]
//! is that seam; the daemon ships a factory that recognizes no bundles
//! so a deployment without custom handlers still starts cleanly, and
//! simply logs every bundle it has no handler for.

use async_trait::async_trait;
use carapace_catalog::Catalog;
use carapace_plugins::{discover_plugins, LoadedPlugin, PluginHandler, PluginLoader, PluginManifest};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Produces a handler for a discovered plugin bundle, or declines it.
#[async_trait]
pub trait PluginHandlerFactory: Send + Sync {
    /// Build a handler for `manifest`, found at `bundle_dir`. Returning
    /// `None` means this factory doesn't know how to run this bundle;
    /// the daemon skips loading it rather than failing startup.
    async fn build(&self, bundle_dir: &PathBuf, manifest: &PluginManifest) -> Option<Arc<dyn PluginHandler>>;
}

/// The default factory: recognizes nothing. Every discovered bundle is
/// logged and skipped. A deployment that embeds real plugin handlers
/// supplies its own [`PluginHandlerFactory`] to [`load_all`].
pub struct NullPluginHandlerFactory;

#[async_trait]
impl PluginHandlerFactory for NullPluginHandlerFactory {
    async fn build(&self, _bundle_dir: &PathBuf, _manifest: &PluginManifest) -> Option<Arc<dyn PluginHandler>> {
        None
    }
}

/// Discover bundles under `roots`, build a handler for each via
/// `factory`, and load the ones a handler was produced for. Bundles
/// the factory declines, and bundles that fail to load, are logged and
/// otherwise don't affect startup.
pub async fn load_all(
    catalog: Arc<Catalog>,
    roots: &[PathBuf],
    factory: &dyn PluginHandlerFactory,
) -> Vec<LoadedPlugin> {
    let discovered = discover_plugins(roots);
    let loader = PluginLoader::new(catalog);
    let mut loaded = Vec::with_capacity(discovered.len());

    for (bundle_dir, manifest) in discovered {
        let Some(handler) = factory.build(&bundle_dir, &manifest).await else {
            info!(plugin = %manifest.name, "no handler factory recognizes this bundle, skipping");
            continue;
        };

        match loader.load(manifest, handler).await {
            Ok(plugin) => loaded.push(plugin),
            Err(err) => warn!(error = %err, "failed to load plugin bundle"),
        }
    }

    loaded
}

/// Shut down every successfully loaded plugin.
pub async fn shutdown_all(catalog: Arc<Catalog>, plugins: &[LoadedPlugin]) {
    PluginLoader::new(catalog).shutdown_all(plugins).await;
}
