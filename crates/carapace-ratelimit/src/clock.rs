//! Injectable time source (: "An explicit 'time source' argument
//! makes tests deterministic").

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// A source of monotonic-ish time for the rate limiter. Measured in
/// fractional seconds since an arbitrary epoch; only differences
/// between calls matter.
pub trait Clock: Send + Sync {
    /// Current time, in seconds.
    fn now_secs(&self) -> f64;
}

/// Wall-clock time via [`Instant`], used in production.
#[derive(Debug)]
pub struct SystemClock {
    start: Instant,
}

impl SystemClock {
    /// Construct a new system clock anchored to the current instant.
    #[must_use]
    pub fn new() -> Self {
        Self { start: Instant::now() }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_secs(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}

/// Returns the current wall-clock time, used only for timestamping
/// audit rows alongside rate-limit decisions — not for bucket math.
#[must_use]
pub fn unix_timestamp_secs() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or(Duration::ZERO).as_secs()
}

/// A test clock whose time only advances when told to.
#[derive(Debug, Default)]
pub struct FakeClock {
    micros: AtomicU64,
}

impl FakeClock {
    /// Construct a fake clock starting at time zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the clock by the given duration.
    pub fn advance(&self, duration: Duration) {
        #[allow(clippy::cast_possible_truncation)]
        self.micros.fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
    }
}

impl Clock for FakeClock {
    fn now_secs(&self) -> f64 {
        self.micros.load(Ordering::Relaxed) as f64 / 1_000_000.0
    }
}
