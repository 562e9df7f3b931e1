use std::thread;
use std::time::{Duration, Instant};

/// Client-side request pacing for a single sequential caller.
///
/// Only the completion time of the previous permitted call is tracked. Each
/// call sleeps exactly the remaining deficit against the minimum interval.
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    last: Option<Instant>,
}

impl RateLimiter {
    /// Limiter allowing at most `max_per_second` calls per second.
    ///
    /// Non-positive or non-finite rates disable pacing.
    #[must_use]
    pub fn new(max_per_second: f64) -> Self {
        let min_interval = if max_per_second.is_finite() && max_per_second > 0.0 {
            Duration::from_secs_f64(1.0 / max_per_second)
        } else {
            Duration::ZERO
        };
        Self {
            min_interval,
            last: None,
        }
    }

    #[must_use]
    pub const fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Block until the next call is allowed. Never fails.
    pub fn wait_if_needed(&mut self) {
        if let Some(last) = self.last {
            let elapsed = last.elapsed();
            if elapsed < self.min_interval {
                thread::sleep(self.min_interval - elapsed);
            }
        }
        self.last = Some(Instant::now());
    }
}
