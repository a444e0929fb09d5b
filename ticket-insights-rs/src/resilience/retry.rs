//! Retry with exponential backoff for recoverable errors
//!
//! Transient inference failures are retried up to a fixed number of total
//! attempts. The delay before retry `n` (0-based) is
//! `initial_interval * multiplier^n`, capped at `max_interval`.

use backoff::{backoff::Backoff, ExponentialBackoffBuilder};
use std::fmt;
use std::future::Future;
use std::time::Duration;

use crate::error::{PipelineError, Result};

/// Retry policy configuration
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total number of attempts, including the first one
    pub max_attempts: u32,

    /// Delay before the first retry
    pub initial_interval: Duration,

    /// Upper bound on a single delay
    pub max_interval: Duration,

    /// Multiplier for backoff between retries
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_interval: Duration::from_secs(1),
            max_interval: Duration::from_secs(60),
            multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Config with the given attempt count and default intervals
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Self::default()
        }
    }
}

impl fmt::Display for RetryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RetryConfig {{ max_attempts: {}, initial_interval: {:?}, max_interval: {:?}, multiplier: {} }}",
            self.max_attempts, self.initial_interval, self.max_interval, self.multiplier
        )
    }
}

/// Executor for retry operations with exponential backoff
#[derive(Debug, Clone)]
pub struct RetryExecutor {
    config: RetryConfig,
}

impl Default for RetryExecutor {
    fn default() -> Self {
        Self::new(RetryConfig::default())
    }
}

impl RetryExecutor {
    /// Create a new retry executor with the specified configuration
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Execute a fallible operation with retries according to the configuration.
    ///
    /// Each invocation of `operation` is one attempt. Fatal errors are returned
    /// immediately; after the last attempt the final error is returned as is.
    pub async fn execute<F, Fut, T>(&self, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        // No jitter and no elapsed-time cap: the attempt count is the only bound
        let mut backoff = ExponentialBackoffBuilder::new()
            .with_initial_interval(self.config.initial_interval)
            .with_max_interval(self.config.max_interval)
            .with_multiplier(self.config.multiplier)
            .with_randomization_factor(0.0)
            .with_max_elapsed_time(None)
            .build();

        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(err) if self.should_retry(&err) && attempt < max_attempts => {
                    let delay = backoff
                        .next_backoff()
                        .unwrap_or(self.config.max_interval);

                    log::warn!(
                        "Operation failed with retryable error, retrying in {:?} (attempt {}/{}): {}",
                        delay,
                        attempt,
                        max_attempts,
                        err
                    );

                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => {
                    if attempt > 1 {
                        log::debug!("Giving up after {} attempts: {}", attempt, err);
                    }
                    return Err(err);
                }
            }
        }
    }

    fn should_retry(&self, error: &PipelineError) -> bool {
        error.is_retryable()
    }

    /// Get the current retry configuration
    pub fn config(&self) -> &RetryConfig {
        &self.config
    }
}
