//! Exponential backoff with proportional jitter for the retry strategy.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Backoff parameters.
///
/// The base delay for attempt `n` is `min(base_delay_ms * 2^n, max_delay_ms)`;
/// a random jitter of up to `jitter_ratio` times that delay is added on top.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffConfig {
    /// Delay before the first retry, in milliseconds.
    pub base_delay_ms: u64,
    /// Cap on the un-jittered delay, in milliseconds.
    pub max_delay_ms: u64,
    /// Upper bound of the jitter as a fraction of the delay.
    pub jitter_ratio: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: 1000,
            max_delay_ms: 30_000,
            jitter_ratio: 0.3,
        }
    }
}

impl BackoffConfig {
    /// Creates a config with the defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the base delay.
    #[must_use]
    pub fn with_base_delay_ms(mut self, delay: u64) -> Self {
        self.base_delay_ms = delay;
        self
    }

    /// Sets the delay cap.
    #[must_use]
    pub fn with_max_delay_ms(mut self, delay: u64) -> Self {
        self.max_delay_ms = delay;
        self
    }

    /// Sets the jitter ratio, clamped to `[0, 1]`.
    #[must_use]
    pub fn with_jitter_ratio(mut self, ratio: f64) -> Self {
        self.jitter_ratio = ratio.clamp(0.0, 1.0);
        self
    }

    /// Disables jitter.
    #[must_use]
    pub fn without_jitter(self) -> Self {
        self.with_jitter_ratio(0.0)
    }

    /// The un-jittered delay for `attempt` (0-indexed), in milliseconds.
    #[must_use]
    pub fn base_delay_for(&self, attempt: u32) -> u64 {
        self.base_delay_ms
            .saturating_mul(2u64.saturating_pow(attempt))
            .min(self.max_delay_ms)
    }

    /// The largest jitter that may be added for `attempt`, in milliseconds.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    pub fn max_jitter_for(&self, attempt: u32) -> u64 {
        (self.base_delay_for(attempt) as f64 * self.jitter_ratio.clamp(0.0, 1.0)).floor() as u64
    }

    /// The jittered delay for `attempt`, in milliseconds.
    #[must_use]
    pub fn delay_ms(&self, attempt: u32) -> u64 {
        let delay = self.base_delay_for(attempt);
        let max_jitter = self.max_jitter_for(attempt);
        if max_jitter == 0 {
            delay
        } else {
            delay.saturating_add(rand::thread_rng().gen_range(0..=max_jitter))
        }
    }

    /// The jittered delay for `attempt` as a duration.
    #[must_use]
    pub fn delay(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.delay_ms(attempt))
    }
}
