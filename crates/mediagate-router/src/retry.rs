//! Retry policy: decides whether to retry a backend and how long to back off.

use std::time::Duration;

use mediagate_core::RouterConfig;

/// Bounded exponential backoff for `store` retries against one backend.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt, per backend
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
}

impl RetryPolicy {
    pub fn from_config(config: &RouterConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: config.backoff_base,
            max_delay: config.backoff_max,
            multiplier: 2.0,
        }
    }

    /// No retries at all
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            multiplier: 1.0,
        }
    }

    /// Whether another attempt is allowed after `attempts` attempts (1-indexed).
    pub fn allows_retry(&self, attempts: u32) -> bool {
        attempts <= self.max_retries
    }

    /// Delay before retry number `retry` (1-indexed):
    /// `base_delay * multiplier^(retry - 1)`, capped at `max_delay`.
    pub fn next_delay(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(32) as i32;
        let delay_nanos = self.base_delay.as_nanos() as f64 * self.multiplier.powi(exponent);
        if !delay_nanos.is_finite() || delay_nanos >= self.max_delay.as_nanos() as f64 {
            return self.max_delay;
        }
        Duration::from_nanos(delay_nanos as u64)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RouterConfig::default())
    }
}
