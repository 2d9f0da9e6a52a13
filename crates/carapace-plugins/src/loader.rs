//! Plugin bundle loading: validate a discovered manifest, register its
//! tools into the catalog, and drive its handler's `initialize`/
//! `shutdown` under a bounded deadline .

use crate::error::PluginError;
use crate::handler::{PluginHandler, PluginServices, PluginToolHandler};
use crate::manifest::PluginManifest;
use carapace_catalog::{Catalog, RegistrationError, ToolDeclaration};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Default deadline for a plugin handler's `initialize` call.
pub const DEFAULT_INIT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default deadline for a plugin handler's `shutdown` call.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// A successfully loaded bundle: its manifest and the handler backing
/// every tool it registered.
pub struct LoadedPlugin {
    /// The bundle's manifest, as discovered.
    pub manifest: PluginManifest,
    /// The bundle's handler, kept so `shutdown` can be invoked later.
    pub handler: Arc<dyn PluginHandler>,
}

/// Validates manifests against the catalog, registers their tools, and
/// bounds handler lifecycle calls.
pub struct PluginLoader {
    catalog: Arc<Catalog>,
    init_timeout: Duration,
    shutdown_timeout: Duration,
}

impl PluginLoader {
    /// Build a loader registering into `catalog` with the default
    /// timeouts.
    #[must_use]
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self { catalog, init_timeout: DEFAULT_INIT_TIMEOUT, shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT }
    }

    /// Override both handler-lifecycle deadlines.
    #[must_use]
    pub fn with_timeouts(mut self, init_timeout: Duration, shutdown_timeout: Duration) -> Self {
        self.init_timeout = init_timeout;
        self.shutdown_timeout = shutdown_timeout;
        self
    }

    /// Validate `manifest`'s tools against the catalog, register each
    /// one with a [`PluginToolHandler`] adapter over `handler`, then
    /// call `handler.initialize` with the configured deadline.
    ///
    /// Registration happens before `initialize` so a bundle that fails
    /// to initialise never leaves partially-registered tools dangling:
    /// on initialise failure, every tool this call registered is rolled
    /// back.
    pub async fn load(        &self,
        manifest: PluginManifest,
        handler: Arc<dyn PluginHandler>,
) -> Result<LoadedPlugin, PluginError> {
        if manifest.tools.is_empty() {
            return Err(PluginError::MissingHandler { name: manifest.name.clone() });
        }

        let mut registered = Vec::with_capacity(manifest.tools.len());
        for tool in &manifest.tools {
            let declaration = ToolDeclaration {
                name: tool.name.clone(),
                description: tool.description.clone(),
                risk_level: tool.risk_level,
                arguments_schema: tool.arguments_schema.clone(),
                allowed_groups: tool.allowed_groups.clone(),
            };
            let adapter = Arc::new(PluginToolHandler::new(Arc::clone(&handler), tool.name.clone()));
            match self.catalog.register(declaration, adapter) {
                Ok(()) => registered.push(tool.name.clone()),
                Err(err) => {
                    self.rollback(&registered);
                    return Err(map_registration_error(&manifest.name, err));
                },
            }
        }

        let services = PluginServices { plugin_name: manifest.name.clone() };
        let init = tokio::time::timeout(self.init_timeout, handler.initialize(services)).await;
        match init {
            Ok(Ok(())) => {
                info!(plugin = %manifest.name, tools = registered.len(), "plugin loaded");
                Ok(LoadedPlugin { manifest, handler })
            },
            Ok(Err(message)) => {
                self.rollback(&registered);
                Err(PluginError::InitError { name: manifest.name, phase: "initialize", message })
            },
            Err(_) => {
                self.rollback(&registered);
                Err(PluginError::Timeout { name: manifest.name, phase: "initialize" })
            },
        }
    }

    fn rollback(&self, tool_names: &[String]) {
        for name in tool_names {
            self.catalog.unregister(name);
        }
    }

    /// Call `shutdown` on every loaded plugin with the configured
    /// deadline; a non-responsive handler is logged and abandoned
    /// rather than allowed to block the others.
    pub async fn shutdown_all(&self, plugins: &[LoadedPlugin]) {
        for plugin in plugins {
            let name = plugin.manifest.name.clone();
            match tokio::time::timeout(self.shutdown_timeout, plugin.handler.shutdown()).await {
                Ok(()) => {},
                Err(_) => warn!(plugin = %name, "plugin shutdown timed out, abandoning"),
            }
        }
    }
}

fn map_registration_error(plugin_name: &str, err: RegistrationError) -> PluginError {
    match err {
        RegistrationError::DuplicateName(name) => {
            PluginError::Collision { plugin: plugin_name.to_string(), name }
        },
        RegistrationError::ReservedName(name) | RegistrationError::InvalidName(name) => {
            PluginError::InvalidManifest {
                path: std::path::PathBuf::new(),
                message: format!("tool name '{name}' is not a valid registration"),
            }
        },
        RegistrationError::SchemaRejected { name, reason } => PluginError::InvalidManifest {
            path: std::path::PathBuf::new(),
            message: format!("tool '{name}' schema rejected: {reason}"),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use carapace_catalog::{HandlerFailure, ToolContext};
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicBool, Ordering};

    struct FakeHandler {
        init_result: Result<(), String>,
        shutdown_called: AtomicBool,
        init_delay: Option<Duration>,
    }

    impl FakeHandler {
        fn ok() -> Self {
            Self { init_result: Ok(()), shutdown_called: AtomicBool::new(false), init_delay: None }
        }

        fn failing(message: &str) -> Self {
            Self { init_result: Err(message.to_string()), shutdown_called: AtomicBool::new(false), init_delay: None }
        }

        fn slow(delay: Duration) -> Self {
            Self { init_result: Ok(()), shutdown_called: AtomicBool::new(false), init_delay: Some(delay) }
        }
    }

    #[async_trait]
    impl PluginHandler for FakeHandler {
        async fn initialize(&self, _services: PluginServices) -> Result<(), String> {
            if let Some(delay) = self.init_delay {
                tokio::time::sleep(delay).await;
            }
            self.init_result.clone()
        }

        async fn call(&self, _tool_name: &str, _ctx: ToolContext, arguments: Value) -> Result<Value, HandlerFailure> {
            Ok(arguments)
        }

        async fn shutdown(&self) {
            self.shutdown_called.store(true, Ordering::SeqCst);
        }
    }

    fn schema() -> Value {
        json!({"type": "object", "additionalProperties": false, "properties": {}})
    }

    fn manifest_with_tool(plugin_name: &str, tool_name: &str) -> PluginManifest {
        PluginManifest {
            name: plugin_name.to_string(),
            version: None,
            description: None,
            tools: vec![crate::manifest::ToolManifestEntry {
                name: tool_name.to_string(),
                description: "test".to_string(),
                risk_level: carapace_core::RiskLevel::Low,
                arguments_schema: schema(),
                allowed_groups: None,
            }],
        }
    }

    #[tokio::test]
    async fn loads_a_well_formed_plugin() {
        let catalog = Arc::new(Catalog::new());
        let loader = PluginLoader::new(Arc::clone(&catalog));
        let manifest = manifest_with_tool("demo", "do_thing");

        loader.load(manifest, Arc::new(FakeHandler::ok())).await.unwrap();

        assert!(catalog.has("do_thing"));
    }

    #[tokio::test]
    async fn rejects_empty_tool_list_as_missing_handler() {
        let catalog = Arc::new(Catalog::new());
        let loader = PluginLoader::new(catalog);
        let manifest = PluginManifest { name: "empty".to_string(), version: None, description: None, tools: vec![] };

        let err = loader.load(manifest, Arc::new(FakeHandler::ok())).await.unwrap_err();
        assert!(matches!(err, PluginError::MissingHandler { .. }));
    }

    #[tokio::test]
    async fn collision_against_an_existing_tool_is_reported_and_rolled_back() {
        let catalog = Arc::new(Catalog::new());
        let loader = PluginLoader::new(Arc::clone(&catalog));
        loader.load(manifest_with_tool("first", "shared_tool"), Arc::new(FakeHandler::ok())).await.unwrap();

        let err = loader
            .load(manifest_with_tool("second", "shared_tool"), Arc::new(FakeHandler::ok()))
            .await
            .unwrap_err();
        assert!(matches!(err, PluginError::Collision { .. }));
        // the first plugin's registration must survive the second's failed load
        assert!(catalog.has("shared_tool"));
    }

    #[tokio::test]
    async fn init_failure_rolls_back_registered_tools() {
        let catalog = Arc::new(Catalog::new());
        let loader = PluginLoader::new(Arc::clone(&catalog));
        let manifest = manifest_with_tool("demo", "do_thing");

        let err = loader.load(manifest, Arc::new(FakeHandler::failing("boom"))).await.unwrap_err();
        assert!(matches!(err, PluginError::InitError { .. }));
        assert!(!catalog.has("do_thing"));
    }

    #[tokio::test]
    async fn slow_init_times_out_and_rolls_back() {
        let catalog = Arc::new(Catalog::new());
        let loader = PluginLoader::new(Arc::clone(&catalog))
            .with_timeouts(Duration::from_millis(10), DEFAULT_SHUTDOWN_TIMEOUT);
        let manifest = manifest_with_tool("demo", "do_thing");

        let err = loader.load(manifest, Arc::new(FakeHandler::slow(Duration::from_secs(5)))).await.unwrap_err();
        assert!(matches!(err, PluginError::Timeout { .. }));
        assert!(!catalog.has("do_thing"));
    }

    #[tokio::test]
    async fn shutdown_all_calls_every_handler() {
        let catalog = Arc::new(Catalog::new());
        let loader = PluginLoader::new(Arc::clone(&catalog));
        let handler = Arc::new(FakeHandler::ok());
        let plugin = loader.load(manifest_with_tool("demo", "do_thing"), Arc::clone(&handler)).await.unwrap();

        loader.shutdown_all(&[plugin]).await;

        assert!(handler.shutdown_called.load(Ordering::SeqCst));
    }
}
