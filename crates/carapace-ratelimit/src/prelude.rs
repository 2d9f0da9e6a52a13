//! Convenience re-exports.

pub use crate::clock::{Clock, FakeClock, SystemClock};
pub use crate::limiter::{RateLimitConfig, RateLimiter};
