//! Retry framework for generative backend calls.
//!
//! Backend calls fail transiently (rate limits, cold local models, flaky
//! networks), so every completion goes through [`execute_with_retry`]. The
//! delay between attempts grows linearly (`attempt_number × base_delay`) and
//! is capped, which keeps observed delays non-decreasing.

use anyhow::{anyhow, Result};
use std::future::Future;
use std::pin::Pin;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Configuration for retry behavior with linear backoff.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (excluding the initial attempt).
    pub max_retries: u32,
    /// Base delay; attempt `n` waits `n × base_delay` before retrying.
    pub base_delay: Duration,
    /// Cap on any single delay.
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }
}

pub type BoxFuture<T> = Pin<Box<dyn Future<Output = Result<T>> + Send>>;

/// Execute an async operation, retrying on failure up to
/// `config.max_retries` times. The final error after exhausting retries
/// names the total attempt count.
pub async fn execute_with_retry<F, T>(config: &RetryConfig, operation: F) -> Result<T>
where
    F: Fn() -> BoxFuture<T>,
{
    let start = Instant::now();
    let mut last_error = None;

    for attempt in 0..=config.max_retries {
        match operation().await {
            Ok(result) => {
                if attempt > 0 {
                    debug!(
                        "Operation succeeded after {} retries ({:?})",
                        attempt,
                        start.elapsed()
                    );
                }
                return Ok(result);
            }
            Err(error) => {
                if attempt == config.max_retries {
                    last_error = Some(error);
                    break;
                }

                let delay = calculate_delay(config, attempt);
                warn!(
                    "Operation failed, retrying in {:?} (attempt {}/{}): {}",
                    delay,
                    attempt + 1,
                    config.max_retries + 1,
                    error
                );
                last_error = Some(error);
                tokio::time::sleep(delay).await;
            }
        }
    }

    match last_error {
        Some(error) => Err(anyhow!(
            "Operation failed after {} attempts over {:?}: {}",
            config.max_retries + 1,
            start.elapsed(),
            error
        )),
        None => Err(anyhow!("Unexpected error in retry logic")),
    }
}

/// Linear backoff: the delay before retry `n` (zero-based attempt index)
/// is `(n + 1) × base_delay`, capped at `max_delay`.
fn calculate_delay(config: &RetryConfig, attempt: u32) -> Duration {
    config
        .base_delay
        .saturating_mul(attempt + 1)
        .min(config.max_delay)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_successful_operation_no_retry() {
        let config = RetryConfig::default();
        let result = execute_with_retry(&config, || Box::pin(async { Ok(42) })).await;
        assert_eq!(result.expect("should succeed"), 42);
    }

    #[tokio::test]
    async fn test_retry_with_eventual_success() {
        let config = RetryConfig::new().with_base_delay(Duration::from_millis(1));
        let counter = Arc::new(AtomicU32::new(0));

        let result = execute_with_retry(&config, || {
            let counter = Arc::clone(&counter);
            Box::pin(async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(anyhow!("temporary failure"))
                } else {
                    Ok(42)
                }
            })
        })
        .await;

        assert_eq!(result.expect("should recover"), 42);
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_attempt_bound() {
        let config = RetryConfig::new()
            .with_max_retries(2)
            .with_base_delay(Duration::from_millis(1));
        let counter = Arc::new(AtomicU32::new(0));

        let result: Result<i32> = execute_with_retry(&config, || {
            let counter = Arc::clone(&counter);
            Box::pin(async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(anyhow!("always fails"))
            })
        })
        .await;

        assert!(result.is_err());
        // Initial attempt + 2 retries.
        assert_eq!(counter.load(Ordering::SeqCst), 3);
        let message = result.unwrap_err().to_string();
        assert!(message.contains("3 attempts"));
        assert!(message.contains("always fails"));
    }

    #[test]
    fn test_linear_delay_is_non_decreasing() {
        let config = RetryConfig::new().with_base_delay(Duration::from_millis(100));

        let delays: Vec<Duration> = (0..4).map(|n| calculate_delay(&config, n)).collect();
        assert_eq!(delays[0], Duration::from_millis(100));
        assert_eq!(delays[1], Duration::from_millis(200));
        assert_eq!(delays[2], Duration::from_millis(300));
        assert!(delays.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_delay_cap() {
        let config = RetryConfig::new()
            .with_base_delay(Duration::from_secs(20))
            .with_max_delay(Duration::from_secs(30));
        assert_eq!(calculate_delay(&config, 5), Duration::from_secs(30));
    }
}
