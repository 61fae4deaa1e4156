//! Retry with exponential backoff and jitter for transient publish failures.
//!
//! Transient failures are retried up to a configured attempt count;
//! permanent failures abort immediately and are never retried.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::draft::Platform;
use crate::errors::PublishError;
use crate::publish::Publisher;

/// Jitter applied to a backoff delay to avoid thundering herds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JitterStrategy {
    /// No jitter.
    None,
    /// Random from 0 to the delay.
    #[default]
    Full,
    /// Half fixed, half random.
    Equal,
}

/// Retry configuration for one external boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempt budget, including the first try.
    pub max_attempts: u32,
    /// Base delay before the first retry, in milliseconds.
    pub base_delay_ms: u64,
    /// Backoff multiplier: delay = base * multiplier^attempt.
    pub multiplier: f64,
    /// Delay cap in milliseconds.
    pub max_delay_ms: u64,
    /// Jitter strategy.
    pub jitter: JitterStrategy,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay_ms: 2_000,
            multiplier: 2.0,
            max_delay_ms: 60_000,
            jitter: JitterStrategy::Full,
        }
    }
}

impl RetryPolicy {
    /// A policy with no delays and no jitter, for tests.
    #[must_use]
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay_ms: 0,
            multiplier: 1.0,
            max_delay_ms: 0,
            jitter: JitterStrategy::None,
        }
    }

    /// Raw backoff delay for a zero-indexed attempt, before jitter.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let raw = self.base_delay_ms as f64 * self.multiplier.powi(attempt as i32);
        let capped = raw.min(self.max_delay_ms as f64).max(0.0);
        Duration::from_millis(capped as u64)
    }

    /// Backoff delay with jitter applied.
    #[must_use]
    pub fn jittered_delay_for(&self, attempt: u32) -> Duration {
        let delay = self.delay_for(attempt).as_millis() as u64;
        let jittered = match self.jitter {
            JitterStrategy::None => delay,
            JitterStrategy::Full => {
                if delay == 0 {
                    0
                } else {
                    rand::thread_rng().gen_range(0..=delay)
                }
            }
            JitterStrategy::Equal => {
                let half = delay / 2;
                if half == 0 {
                    delay
                } else {
                    half + rand::thread_rng().gen_range(0..=half)
                }
            }
        };
        Duration::from_millis(jittered)
    }
}

/// Publishes with retries: transient errors retry until the attempt
/// budget runs out, permanent errors return immediately. The final error
/// is returned on exhaustion.
pub async fn publish_with_retry(
    publisher: &dyn Publisher,
    platform: Platform,
    text: &str,
    policy: &RetryPolicy,
) -> Result<String, PublishError> {
    let mut attempt: u32 = 0;
    loop {
        match publisher.publish(platform, text).await {
            Ok(url) => return Ok(url),
            Err(err @ PublishError::Permanent { .. }) => {
                tracing::warn!(%platform, error = %err, "permanent publish error, not retrying");
                return Err(err);
            }
            Err(err @ PublishError::Transient { .. }) => {
                attempt += 1;
                if attempt >= policy.max_attempts {
                    tracing::warn!(
                        %platform,
                        attempts = attempt,
                        error = %err,
                        "publish retries exhausted"
                    );
                    return Err(err);
                }
                let delay = policy.jittered_delay_for(attempt - 1);
                tracing::debug!(
                    %platform,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "transient publish error, retrying"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}
