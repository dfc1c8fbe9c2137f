//! Exponential backoff for failed actions.

use std::time::Duration;

/// Longest delay any policy will produce, whatever cap it was built with.
pub const MAX_BACKOFF_DELAY: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone, PartialEq)]
pub struct BackoffPolicy {
    /// Delay unit; the nth retry waits `base * 2^n` before jitter.
    pub base: Duration,
    /// Upper bound on any delay, jitter included. Never above
    /// [`MAX_BACKOFF_DELAY`].
    pub max_delay: Duration,
    /// Spread delays over `[0.5, 1.5)` of the nominal value.
    pub jitter: bool,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base: Duration::from_secs(1),
            max_delay: Duration::from_secs(300),
            jitter: true,
        }
    }
}

impl BackoffPolicy {
    pub fn new(base: Duration, max_delay: Duration) -> Self {
        Self {
            base,
            max_delay: max_delay.min(MAX_BACKOFF_DELAY),
            jitter: true,
        }
    }

    pub fn without_jitter(mut self) -> Self {
        self.jitter = false;
        self
    }

    /// Delay before the attempt following failure number `retry_count`.
    pub fn delay_for(&self, retry_count: u32) -> Duration {
        let exponent = retry_count.min(i32::MAX as u32) as i32;
        let nominal = self.base.as_secs_f64() * 2f64.powi(exponent);
        let max = self.max_delay.min(MAX_BACKOFF_DELAY).as_secs_f64();
        let capped = nominal.min(max);

        let delay = if self.jitter {
            (capped * (0.5 + fastrand::f64())).min(max)
        } else {
            capped
        };

        Duration::from_secs_f64(delay)
    }
}
