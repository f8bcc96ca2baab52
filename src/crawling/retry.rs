//! Retry policy for individual searches.
//!
//! Exponential backoff with a cap and a small jitter window, applied by the
//! search executor between transient failures.

use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Base delay in milliseconds.
    pub base_delay_ms: u64,
    /// Delay cap in milliseconds.
    pub max_delay_ms: u64,
    /// Backoff multiplier (e.g. 2.0 doubles the delay per attempt).
    pub backoff_multiplier: f64,
    /// Jitter window in milliseconds, added on top of the capped delay.
    pub jitter_range_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
            max_delay_ms: 30_000,
            backoff_multiplier: 2.0,
            jitter_range_ms: 500,
        }
    }
}

impl RetryPolicy {
    /// Policy with no waiting, for tests exercising retry counting.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay_ms: 0,
            max_delay_ms: 0,
            backoff_multiplier: 1.0,
            jitter_range_ms: 0,
        }
    }

    /// Delay before the retry that follows failed attempt `attempt`
    /// (1-based): `base * multiplier^(attempt-1)`, capped, plus jitter.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponential = (self.base_delay_ms as f64
            * self.backoff_multiplier.powi(attempt.saturating_sub(1) as i32))
            as u64;
        let capped = exponential.min(self.max_delay_ms);
        let jitter = if self.jitter_range_ms == 0 {
            0
        } else {
            fastrand::u64(0..=self.jitter_range_ms)
        };
        Duration::from_millis(capped + jitter)
    }
}
