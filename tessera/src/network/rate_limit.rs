//! Per-connection request rate limiting.

use std::time::{Duration, Instant};

/// Counts `GET_CHUNK` requests per wall-clock second. Requests beyond
/// the budget are dropped silently by the caller; the connection
/// itself stays healthy.
pub struct RateLimiter {
    max_per_second: u32,
    window_start: Instant,
    count: u32,
}

impl RateLimiter {
    /// Creates a limiter with the given per-second budget.
    #[must_use]
    pub fn new(max_per_second: u32) -> Self {
        Self {
            max_per_second,
            window_start: Instant::now(),
            count: 0,
        }
    }

    /// Whether the current request fits the budget.
    pub fn allow(&mut self) -> bool {
        self.allow_at(Instant::now())
    }

    fn allow_at(&mut self, now: Instant) -> bool {
        if now.duration_since(self.window_start) >= Duration::from_secs(1) {
            self.window_start = now;
            self.count = 0;
        }
        if self.count < self.max_per_second {
            self.count += 1;
            true
        } else {
            false
        }
    }
}
