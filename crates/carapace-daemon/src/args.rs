//! Command-line surface for the `carapaced` binary.

use clap::Parser;
use std::path::PathBuf;

/// Carapace — host-side supervisor for sandboxed agent containers.
#[derive(Parser, Debug)]
#[command(name = "carapaced")]
#[command(author, version, about = "carapace daemon — agent container supervisor")]
pub struct Args {
    /// Path to a TOML configuration file. Defaults are used for
    /// anything the file omits; if the path itself is omitted, the
    /// daemon runs entirely on built-in defaults.
    #[arg(long, env = "CARAPACE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override `log_level` from the config file.
    #[arg(long, env = "CARAPACE_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Emit logs as JSON lines instead of the compact human format.
    #[arg(long)]
    pub log_json: bool,
}
