//! `carapaced` — the carapace daemon binary.
//!
//! Thin entry point: parse arguments, load configuration, build every
//! subsystem via `wiring::build`, run until a shutdown signal, then
//! drain in flight work in a defined order.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]

mod args;
mod claims;
mod containers;
mod logging;
mod plugins;
mod sanitizer;
mod wiring;

use anyhow::{Context, Result};
use args::Args;
use carapace_config::CarapaceConfig;
use carapace_transport::RequestHandler;
use clap::Parser;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => CarapaceConfig::load_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => CarapaceConfig::default(),
    };
    if let Some(level) = &args.log_level {
        config.log_level = level.clone();
    }
    if args.log_json {
        config.log_json = true;
    }

    logging::init(&config.log_level, config.log_json);

    let daemon = wiring::build(&config).await.context("building daemon")?;
    info!(
        requests = %daemon.layout.requests_socket.display(),
        events = %daemon.layout.events_socket.display(),
        tools = daemon.catalog.len(),
        plugins = daemon.plugins.len(),
        "carapace daemon starting"
    );

    let request_handler: Arc<dyn RequestHandler> = Arc::clone(&daemon.pipeline) as Arc<dyn RequestHandler>;
    let router_task = tokio::spawn(daemon.router.serve(request_handler));
    let pub_task = tokio::spawn(daemon.pub_server.serve(Arc::clone(&daemon.container_bridge.bus)));
    let crash_poll_task = tokio::spawn({
        let lifecycle = Arc::clone(&daemon.lifecycle);
        async move { lifecycle.run_crash_poll_loop().await }
    });
    let container_bridge_task = tokio::spawn(daemon.container_bridge.run());

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("received shutdown signal");
        },
    }

    info!("shutting down: stopping background tasks");
    router_task.abort();
    pub_task.abort();
    crash_poll_task.abort();
    container_bridge_task.abort();

    info!("shutting down: cancelling pending confirmations");
    daemon.confirm.cancel_all();

    info!("shutting down: stopping containers");
    daemon.lifecycle.shutdown().await;

    info!("shutting down: unloading plugins");
    plugins::shutdown_all(daemon.catalog.clone(), &daemon.plugins).await;

    info!("carapace daemon stopped");
    Ok(())
}
