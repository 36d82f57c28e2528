//! Exponential backoff for keys whose last reconcile failed.

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Retry policy configuration for failed reconciles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Consecutive failures after which a key is left alone until it changes.
    ///
    /// Default: None (retry forever)
    #[serde(default)]
    pub max_attempts: Option<u32>,

    /// Base delay for exponential backoff (in seconds).
    ///
    /// The actual delay is calculated as: `base * 2^(attempts - 1)`
    ///
    /// Default: 5 seconds
    #[serde(default = "defaults::base_retry_delay_secs")]
    pub base_retry_delay_secs: u64,

    /// Maximum retry delay (in seconds).
    ///
    /// Default: 300 seconds (5 minutes)
    #[serde(default = "defaults::max_retry_delay_secs")]
    pub max_retry_delay_secs: u64,

    /// Jitter factor for randomizing retry delays.
    ///
    /// The delay is randomized within ±`jitter_factor`.
    ///
    /// Default: 0.1 (±10%)
    #[serde(default = "defaults::retry_jitter_factor")]
    pub retry_jitter_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: None,
            base_retry_delay_secs: defaults::base_retry_delay_secs(),
            max_retry_delay_secs: defaults::max_retry_delay_secs(),
            retry_jitter_factor: defaults::retry_jitter_factor(),
        }
    }
}

impl RetryPolicy {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if a key that has failed `failures` times in a row should be retried.
    #[must_use]
    pub fn should_retry(&self, failures: u32) -> bool {
        self.max_attempts.is_none_or(|max| failures < max)
    }

    /// Delay before retrying a key that has failed `failures` times in a row.
    #[must_use]
    pub fn delay_for(&self, failures: u32) -> Duration {
        backoff_delay(
            failures,
            self.base_retry_delay_secs,
            self.max_retry_delay_secs,
            self.retry_jitter_factor,
        )
    }
}

/// Calculate a retry delay using exponential backoff with jitter
///
/// # Formula
/// `delay = min(base * 2^(attempts - 1), max_delay) * (1 ± jitter)`
///
/// `attempt` is 1-indexed.
pub fn backoff_delay(
    attempt: u32,
    base_delay_secs: u64,
    max_delay_secs: u64,
    jitter_factor: f64,
) -> Duration {
    let exponent = attempt.saturating_sub(1);
    let delay = if exponent >= 63 {
        max_delay_secs
    } else {
        let multiplier = 1u64 << exponent;
        base_delay_secs
            .saturating_mul(multiplier)
            .min(max_delay_secs)
    };

    if jitter_factor <= 0.0 || delay == 0 {
        return Duration::from_secs(delay);
    }

    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    let jittered_millis = {
        let millis = (delay as f64) * 1000.0;
        let jitter_range = millis * jitter_factor;
        let jitter: f64 = rand::rng().random_range(-jitter_range..=jitter_range);
        (millis + jitter).max(0.0) as u64
    };

    Duration::from_millis(jittered_millis)
}

mod defaults {
    pub const fn base_retry_delay_secs() -> u64 {
        5
    }

    pub const fn max_retry_delay_secs() -> u64 {
        300 // 5 minutes
    }

    pub const fn retry_jitter_factor() -> f64 {
        0.1 // ±10%
    }
}
