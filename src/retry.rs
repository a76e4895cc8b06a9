//! Retry strategies for transient source failures.
//!
//! Applied by the caller around a pipeline run; the pipeline itself never
//! retries. Only [`Error::SourceUnavailable`] is considered transient.

use crate::error::{Error, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::info;

/// Retry strategy
#[derive(Debug, Clone)]
pub enum RetryStrategy {
    /// Fixed interval between attempts
    FixedInterval {
        interval: Duration,
        max_attempts: u32,
    },
    /// Exponentially growing delay, capped
    ExponentialBackoff {
        initial_delay: Duration,
        max_delay: Duration,
        multiplier: f64,
        max_attempts: u32,
    },
}

impl RetryStrategy {
    /// Default exponential backoff strategy
    pub fn default_exponential() -> Self {
        Self::ExponentialBackoff {
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
            max_attempts: 3,
        }
    }

    /// A single attempt, no retries
    pub fn none() -> Self {
        Self::FixedInterval {
            interval: Duration::ZERO,
            max_attempts: 1,
        }
    }

    /// Run `operation`, retrying transient failures per the strategy.
    pub async fn execute<F, T, Fut>(&self, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max_attempts = self.max_attempts().max(1);
        let mut attempt = 1;
        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) if attempt < max_attempts && Self::should_retry(&e) => {
                    let delay = self.delay_for(attempt);
                    info!(
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "retrying after transient source failure"
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn max_attempts(&self) -> u32 {
        match self {
            Self::FixedInterval { max_attempts, .. } => *max_attempts,
            Self::ExponentialBackoff { max_attempts, .. } => *max_attempts,
        }
    }

    /// Delay before attempt `attempt + 1`; `attempt` counts from 1.
    fn delay_for(&self, attempt: u32) -> Duration {
        match self {
            Self::FixedInterval { interval, .. } => *interval,
            Self::ExponentialBackoff {
                initial_delay,
                max_delay,
                multiplier,
                ..
            } => {
                let scale = multiplier.powi(attempt.saturating_sub(1) as i32);
                let delay_ms = (initial_delay.as_millis() as f64) * scale;
                Duration::from_millis(delay_ms as u64).min(*max_delay)
            }
        }
    }

    fn should_retry(error: &Error) -> bool {
        error.is_transient()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_fixed_interval_retries_transient_failures() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = Arc::clone(&counter);

        let strategy = RetryStrategy::FixedInterval {
            interval: Duration::from_millis(10),
            max_attempts: 3,
        };

        let result = strategy
            .execute(|| {
                let counter = Arc::clone(&counter_clone);
                async move {
                    let attempt = counter.fetch_add(1, Ordering::SeqCst);
                    if attempt < 2 {
                        Err(Error::SourceUnavailable("connection refused".to_string()))
                    } else {
                        Ok("ok")
                    }
                }
            })
            .await;

        assert!(result.is_ok());
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_non_transient_failures_are_not_retried() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = Arc::clone(&counter);

        let strategy = RetryStrategy::default_exponential();
        let result: Result<()> = strategy
            .execute(|| {
                let counter = Arc::clone(&counter_clone);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(Error::MalformedResponse("bad payload".to_string()))
                }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_exhausted_attempts_return_last_error() {
        let strategy = RetryStrategy::FixedInterval {
            interval: Duration::from_millis(1),
            max_attempts: 2,
        };

        let result: Result<()> = strategy
            .execute(|| async { Err(Error::SourceUnavailable("always down".to_string())) })
            .await;

        assert!(matches!(result, Err(Error::SourceUnavailable(_))));
    }

    #[test]
    fn test_exponential_delay_grows_and_caps() {
        let strategy = RetryStrategy::ExponentialBackoff {
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(350),
            multiplier: 2.0,
            max_attempts: 5,
        };

        assert_eq!(strategy.delay_for(1), Duration::from_millis(100));
        assert_eq!(strategy.delay_for(2), Duration::from_millis(200));
        assert_eq!(strategy.delay_for(3), Duration::from_millis(350));
        assert_eq!(strategy.delay_for(4), Duration::from_millis(350));
    }

    #[tokio::test]
    async fn test_single_attempt_strategy() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = Arc::clone(&counter);

        let result: Result<()> = RetryStrategy::none()
            .execute(|| {
                let counter = Arc::clone(&counter_clone);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(Error::SourceUnavailable("down".to_string()))
                }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
