//! Connect retry with exponential backoff
//!
//! Connection failures are the one error class the engine retries itself:
//! a database that is still starting up, a transient network fault, or a
//! saturated server. Authentication failures and unknown databases are
//! surfaced immediately.

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::warn;

use crate::AdapterError;

/// Retry policy for opening a connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts after the first.
    pub max_retries: usize,

    /// Delay before the second attempt.
    pub initial_delay: Duration,

    /// Ceiling on the backoff delay.
    pub max_delay: Duration,

    /// Exponential backoff multiplier.
    pub multiplier: f64,

    /// Randomize delays to avoid thundering herds.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// A policy that never retries.
    #[must_use]
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Delay for a given zero-based attempt number.
    #[must_use]
    pub fn calculate_delay(&self, attempt: usize) -> Duration {
        let pow = i32::try_from(attempt).unwrap_or(i32::MAX);
        let delay_secs = self.initial_delay.as_secs_f64() * self.multiplier.powi(pow);
        let delay = Duration::from_secs_f64(delay_secs.min(self.max_delay.as_secs_f64()));

        if self.jitter {
            let factor = rand::rng().random_range(0.5..=1.0);
            Duration::from_secs_f64(delay.as_secs_f64() * factor)
        } else {
            delay
        }
    }
}

/// Run `operation` until it succeeds, the error stops being retryable, or
/// the attempt budget is exhausted.
///
/// # Errors
///
/// Returns the last [`AdapterError`] encountered.
pub async fn with_retry<F, Fut, T>(
    config: &RetryConfig,
    operation_name: &str,
    mut operation: F,
) -> Result<T, AdapterError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, AdapterError>>,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && attempt < config.max_retries => {
                let delay = config.calculate_delay(attempt);
                warn!(
                    operation = operation_name,
                    attempt = attempt + 1,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    "retryable failure: {err}"
                );
                sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn backoff_grows_and_caps() {
        let config = RetryConfig {
            jitter: false,
            ..RetryConfig::default()
        };
        assert_eq!(config.calculate_delay(0), Duration::from_secs(1));
        assert_eq!(config.calculate_delay(1), Duration::from_secs(2));
        assert_eq!(config.calculate_delay(2), Duration::from_secs(4));
        assert_eq!(config.calculate_delay(10), Duration::from_secs(30));
    }

    #[tokio::test]
    async fn non_retryable_errors_are_immediate() {
        let attempts = AtomicUsize::new(0);
        let result: Result<(), _> = with_retry(&RetryConfig::default(), "test", || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async {
                Err(AdapterError::InvalidIdentifier {
                    name: "x".to_string(),
                })
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn succeeds_without_retrying() {
        let result = with_retry(&RetryConfig::none(), "test", || async { Ok(42) }).await;
        assert_eq!(result.unwrap(), 42);
    }
}
