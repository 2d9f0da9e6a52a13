//! `tracing-subscriber` setup, driven by the resolved configuration.

use tracing_subscriber::{fmt, EnvFilter};

/// Install the global subscriber. Called once from `main` before
/// anything else logs.
pub fn init(log_level: &str, json: bool) {
    let filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = fmt().with_env_filter(filter).with_target(true);
    let installed = if json { subscriber.json().try_init() } else { subscriber.try_init() };

    if let Err(err) = installed {
        eprintln!("failed to install tracing subscriber: {err}");
    }
}
