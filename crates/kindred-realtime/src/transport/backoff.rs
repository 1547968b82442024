//! Reconnection backoff

use rand::Rng;
use std::time::Duration;

/// Exponential backoff with jitter, bounded to `[min, max]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub min: Duration,
    pub max: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            min: Duration::from_secs(1),
            max: Duration::from_secs(5),
        }
    }
}

impl ReconnectPolicy {
    #[must_use]
    pub fn new(min: Duration, max: Duration) -> Self {
        Self {
            min,
            max: max.max(min),
        }
    }

    /// Delay before the given attempt (1-based)
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let base = self.min.saturating_mul(1 << exponent).min(self.max);
        let jitter = rand::thread_rng().gen_range(0.0..=0.5);
        base.mul_f64(1.0 - jitter).clamp(self.min, self.max)
    }
}
