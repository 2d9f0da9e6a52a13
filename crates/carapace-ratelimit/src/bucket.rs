//! Single token bucket .

/// Continuous-refill token bucket. Refills at `rate/60` tokens/s,
/// saturating at `burst_size`, and hands out fractional-second
/// `retry_after` hints when empty.
#[derive(Debug, Clone)]
pub struct TokenBucket {
    burst_size: f64,
    tokens_per_second: f64,
    tokens: f64,
    last_refill_secs: f64,
}

impl TokenBucket {
    /// Construct a full bucket for the given `(requestsPerMinute, burstSize)`
    /// configuration, anchored at `now_secs`.
    #[must_use]
    pub fn new(requests_per_minute: u32, burst_size: u32, now_secs: f64) -> Self {
        Self {
            burst_size: f64::from(burst_size),
            tokens_per_second: f64::from(requests_per_minute) / 60.0,
            tokens: f64::from(burst_size),
            last_refill_secs: now_secs,
        }
    }

    fn refill(&mut self, now_secs: f64) {
        let elapsed = (now_secs - self.last_refill_secs).max(0.0);
        self.tokens = (self.tokens + elapsed * self.tokens_per_second).min(self.burst_size);
        self.last_refill_secs = now_secs;
    }

    /// Attempt to take one token. On success, returns `Ok(())`. On
    /// failure, returns `Err(retry_after_secs)` — `ceil(timeUntilNextToken)`.
    pub fn try_acquire(&mut self, now_secs: f64) -> Result<(), u64> {
        self.refill(now_secs);
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            return Ok(());
        }

        if self.tokens_per_second <= 0.0 {
            return Err(u64::MAX);
        }
        let deficit = 1.0 - self.tokens;
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let retry_after = (deficit / self.tokens_per_second).ceil() as u64;
        Err(retry_after.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grants_up_to_burst_size_immediately() {
        let mut bucket = TokenBucket::new(60, 2, 0.0);
        assert!(bucket.try_acquire(0.0).is_ok());
        assert!(bucket.try_acquire(0.0).is_ok());
        assert!(bucket.try_acquire(0.0).is_err());
    }

    #[test]
    fn refills_continuously_over_time() {
        let mut bucket = TokenBucket::new(60, 1, 0.0);
        assert!(bucket.try_acquire(0.0).is_ok());
        assert!(bucket.try_acquire(0.5).is_err());
        assert!(bucket.try_acquire(1.0).is_ok());
    }

    #[test]
    fn retry_after_is_ceiling_of_wait_time() {
        let mut bucket = TokenBucket::new(2, 2, 0.0);
        bucket.try_acquire(0.0).unwrap();
        bucket.try_acquire(0.0).unwrap();
        let err = bucket.try_acquire(0.0).unwrap_err();
        // rate = 2/60 tokens/s; need 1 token => 30s, ceil(30) = 30
        assert_eq!(err, 30);
    }

    #[test]
    fn never_exceeds_burst_size() {
        let mut bucket = TokenBucket::new(600, 3, 0.0);
        assert!(bucket.try_acquire(1000.0).is_ok());
        assert!(bucket.try_acquire(1000.0).is_ok());
        assert!(bucket.try_acquire(1000.0).is_ok());
        assert!(bucket.try_acquire(1000.0).is_err());
    }
}
