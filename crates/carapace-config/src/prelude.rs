//! Convenience re-exports.

pub use crate::error::ConfigError;
pub use crate::paths::Layout;
pub use crate::types::{
    CarapaceConfig, ContainerSettings, GroupSettings, RateLimitSettings, SanitizePatternSettings,
    SanitizerSettings,
};
