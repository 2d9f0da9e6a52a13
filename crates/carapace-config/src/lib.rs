//! Carapace Config — the typed configuration struct every other
//! subsystem is constructed from, plus a single-file TOML loader.
//!
//! Config-file *discovery* (system/user/workspace search paths,
//! environment-variable precedence) is an external-collaborator
//! concern per `spec.md` ; this crate owns the struct's shape, its
//! production-ready defaults, and the validation that turns a parsed
//! document into something the daemon can safely build subsystems
//! from.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]

pub mod error;
pub mod loader;
pub mod paths;
pub mod prelude;
pub mod types;
pub mod validate;

pub use error::ConfigError;
pub use paths::Layout;
pub use types::{
    CarapaceConfig, ContainerSettings, GroupSettings, RateLimitSettings, SanitizePatternSettings,
    SanitizerSettings,
};
