//! Reconnection policy with exponential backoff and jitter.
//!
//! A closed notification channel never reopens itself. Callers that want a
//! replacement connection own a [`ReconnectPolicy`] and hand it to a
//! supervisor loop, which opens fresh channels until the policy is
//! exhausted or the session shuts down.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default cap on consecutive failed connection attempts.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Default delay before the first reconnect, in milliseconds.
pub const DEFAULT_BASE_DELAY_MS: u64 = 1000;

/// Default ceiling for the backoff delay, in milliseconds.
pub const DEFAULT_MAX_DELAY_MS: u64 = 30_000;

/// Default jitter factor applied to each delay.
pub const DEFAULT_JITTER_FACTOR: f64 = 0.2;

/// Caller-owned policy governing when and how often to reconnect.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconnectPolicy {
    /// Consecutive failed attempts tolerated before giving up. A successful
    /// open resets the count.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Base delay in milliseconds, doubled on each consecutive failure.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Ceiling for the exponential delay in milliseconds, before jitter.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Jitter factor in `[0, 1]`. A factor of 0.2 spreads each delay
    /// uniformly across ±20% of its nominal value.
    #[serde(default = "default_jitter_factor")]
    pub jitter_factor: f64,
}

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

fn default_base_delay_ms() -> u64 {
    DEFAULT_BASE_DELAY_MS
}

fn default_max_delay_ms() -> u64 {
    DEFAULT_MAX_DELAY_MS
}

fn default_jitter_factor() -> f64 {
    DEFAULT_JITTER_FACTOR
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            jitter_factor: default_jitter_factor(),
        }
    }
}

impl ReconnectPolicy {
    /// Backoff delay for the given zero-based attempt number.
    #[must_use]
    pub fn delay(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.delay_with_random(attempt, rand::random::<f64>()))
    }

    /// Backoff delay in milliseconds with an explicit random sample.
    ///
    /// The nominal delay doubles per attempt and is capped at
    /// `max_delay_ms`; `random` in `[0, 1]` then shifts it within the
    /// jitter window. Exposed for deterministic tests.
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_possible_wrap,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn delay_with_random(&self, attempt: u32, random: f64) -> u64 {
        let exponent = attempt.min(31);
        let nominal = (self.base_delay_ms as f64) * 2f64.powi(exponent as i32);
        let capped = nominal.min(self.max_delay_ms as f64);
        let jitter = (random * 2.0 - 1.0) * self.jitter_factor;
        (capped * (1.0 + jitter)).round().max(0.0) as u64
    }

    /// Whether the given count of consecutive failures exhausts the policy.
    #[must_use]
    pub fn is_exhausted(&self, failures: u32) -> bool {
        failures >= self.max_attempts
    }
}
