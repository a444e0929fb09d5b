//! Resilience patterns for inference calls
//!
//! This module provides:
//! - Retry with exponential backoff
//! - A facade that wraps every attempt in a hard timeout and, optionally,
//!   a concurrency gate permit

mod retry;

pub use retry::{RetryConfig, RetryExecutor};

use std::future::Future;
use std::time::Duration;
use tokio::sync::Semaphore;

use crate::error::{PipelineError, Result};

/// A unified resilience facade composing retry, per-attempt timeout and gating
#[derive(Debug, Clone, Default)]
pub struct Resilience {
    retry: RetryExecutor,
}

impl Resilience {
    /// Create a new resilience facade with the given retry policy
    pub fn new(retry_config: RetryConfig) -> Self {
        Self {
            retry: RetryExecutor::new(retry_config),
        }
    }

    /// Execute `operation` with retries.
    ///
    /// Each attempt holds one permit of `gate` (when given) for exactly the
    /// lifetime of the attempt and is cancelled after `attempt_timeout`.
    /// Permits are released before any backoff sleep.
    pub async fn execute<F, Fut, T>(
        &self,
        attempt_timeout: Duration,
        gate: Option<&Semaphore>,
        mut operation: F,
    ) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.retry
            .execute(|| {
                let attempt = operation();
                async move {
                    let _permit = match gate {
                        Some(gate) => Some(gate.acquire().await.map_err(|_| {
                            PipelineError::internal("concurrency gate was closed")
                        })?),
                        None => None,
                    };

                    match tokio::time::timeout(attempt_timeout, attempt).await {
                        Ok(result) => result,
                        Err(_) => Err(PipelineError::timeout(format!(
                            "request did not complete within {:?}",
                            attempt_timeout
                        ))),
                    }
                }
            })
            .await
    }

    /// Get the retry configuration
    pub fn retry_config(&self) -> &RetryConfig {
        self.retry.config()
    }
}
