//! The per-`(session, tool)` rate limiter .

use crate::bucket::TokenBucket;
use crate::clock::{Clock, SystemClock};
use carapace_core::SessionId;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct BucketKey {
    session_id: SessionId,
    tool_name: String,
}

/// `(requestsPerMinute, burstSize)` configuration .
#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    /// Sustained rate, in requests per minute.
    pub requests_per_minute: u32,
    /// Maximum instantaneous burst.
    pub burst_size: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self { requests_per_minute: 60, burst_size: 10 }
    }
}

/// Token-bucket rate limiter keyed by `(sessionId, toolName)`. Buckets
/// for different sessions are independent (: multi-tenant
/// isolation); state is dropped when the owning session is destroyed.
pub struct RateLimiter {
    buckets: Mutex<HashMap<BucketKey, TokenBucket>>,
    config: RateLimitConfig,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    /// Construct a limiter using the real system clock.
    #[must_use]
    pub fn new(config: RateLimitConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock::new()))
    }

    /// Construct a limiter against an explicit clock, for deterministic tests.
    #[must_use]
    pub fn with_clock(config: RateLimitConfig, clock: Arc<dyn Clock>) -> Self {
        Self { buckets: Mutex::new(HashMap::new()), config, clock }
    }

    /// Attempt to take one token for this `(session, tool)` pair,
    /// lazily instantiating a fresh bucket on first use. Bucket
    /// mutation is serialised per key so no interleaving can grant two
    /// tokens where only one was available.
    pub fn try_acquire(&self, session_id: SessionId, tool_name: &str) -> Result<(), u64> {
        let now = self.clock.now_secs();
        let key = BucketKey { session_id, tool_name: tool_name.to_string() };
        let mut buckets = self.buckets.lock();
        let bucket = buckets
            .entry(key)
            .or_insert_with(|| TokenBucket::new(self.config.requests_per_minute, self.config.burst_size, now));
        bucket.try_acquire(now)
    }

    /// Drop every bucket belonging to a destroyed session .
    pub fn remove_session(&self, session_id: SessionId) {
        self.buckets.lock().retain(|key, _| key.session_id != session_id);
    }

    /// Number of live buckets, for diagnostics.
    #[must_use]
    pub fn bucket_count(&self) -> usize {
        self.buckets.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FakeClock;
    use std::time::Duration;

    #[test]
    fn buckets_are_independent_per_session_and_tool() {
        let limiter = RateLimiter::new(RateLimitConfig { requests_per_minute: 60, burst_size: 1 });
        let a = SessionId::new();
        let b = SessionId::new();
        assert!(limiter.try_acquire(a, "read_file").is_ok());
        assert!(limiter.try_acquire(b, "read_file").is_ok());
        assert!(limiter.try_acquire(a, "write_file").is_ok());
    }

    #[test]
    fn third_request_in_ten_seconds_is_rate_limited() {
        let clock = Arc::new(FakeClock::new());
        let limiter =
            RateLimiter::with_clock(RateLimitConfig { requests_per_minute: 2, burst_size: 2 }, clock.clone());
        let session = SessionId::new();
        assert!(limiter.try_acquire(session, "tool").is_ok());
        assert!(limiter.try_acquire(session, "tool").is_ok());
        clock.advance(Duration::from_secs(10));
        let err = limiter.try_acquire(session, "tool").unwrap_err();
        assert!(err >= 1);
    }

    #[test]
    fn removing_a_session_drops_its_buckets() {
        let limiter = RateLimiter::new(RateLimitConfig::default());
        let session = SessionId::new();
        limiter.try_acquire(session, "tool").unwrap();
        assert_eq!(limiter.bucket_count(), 1);
        limiter.remove_session(session);
        assert_eq!(limiter.bucket_count(), 0);
    }
}
