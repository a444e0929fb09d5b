//! Core abstractions for talking to the inference service
//!
//! - `InferenceService`: one prompt in, one completion out, a single attempt
//! - `InferenceClient`: wraps a service with retry, per-attempt timeout and
//!   an optional concurrency gate
//! - `ClientBuilder`: assembles the production client from configuration

pub mod builder;
pub use builder::ClientBuilder;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

use crate::error::Result;
use crate::resilience::{Resilience, RetryConfig};
use crate::util::{log_excerpt, measure_time_async};

/// A single completion request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    /// Full prompt text, sent as one user turn
    pub prompt: String,

    /// Upper bound on generated tokens
    pub max_tokens: u32,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            prompt: prompt.into(),
            max_tokens,
        }
    }
}

/// A text-inference backend performing exactly one attempt per call.
///
/// Implementations classify their own failures; retries happen above them.
#[async_trait]
pub trait InferenceService: Send + Sync {
    /// The service name/identifier
    fn name(&self) -> &str {
        "inference"
    }

    /// Produce the completion text for `request`
    async fn complete(&self, request: &CompletionRequest) -> Result<String>;
}

/// Retrying, gated front end over an `InferenceService`
#[derive(Clone)]
pub struct InferenceClient {
    service: Arc<dyn InferenceService>,
    resilience: Resilience,
}

impl InferenceClient {
    /// Create a client with the default retry policy
    pub fn new(service: Arc<dyn InferenceService>) -> Self {
        Self::with_retry(service, RetryConfig::default())
    }

    /// Create a client with a custom retry policy
    pub fn with_retry(service: Arc<dyn InferenceService>, retry: RetryConfig) -> Self {
        Self {
            service,
            resilience: Resilience::new(retry),
        }
    }

    /// Name of the underlying service
    pub fn service_name(&self) -> &str {
        self.service.name()
    }

    /// The retry policy in effect
    pub fn retry_config(&self) -> &RetryConfig {
        self.resilience.retry_config()
    }

    /// Send `prompt` and return the completion text.
    ///
    /// Each attempt runs under `timeout` and, if `gate` is given, holds one of
    /// its permits only while the attempt is in flight. Retryable failures are
    /// retried with exponential backoff; the final error is returned unchanged.
    pub async fn call(
        &self,
        prompt: &str,
        max_tokens: u32,
        timeout: Duration,
        gate: Option<&Semaphore>,
    ) -> Result<String> {
        let request = CompletionRequest::new(prompt, max_tokens);
        log::debug!(
            "Calling {} (max_tokens={}): {}",
            self.service.name(),
            max_tokens,
            log_excerpt(prompt, 120)
        );

        let (result, elapsed) = measure_time_async(|| {
            self.resilience
                .execute(timeout, gate, || self.service.complete(&request))
        })
        .await;

        match &result {
            Ok(text) => log::debug!(
                "{} completed in {:?} ({} chars)",
                self.service.name(),
                elapsed,
                text.chars().count()
            ),
            Err(e) => log::warn!("{} call failed after {:?}: {}", self.service.name(), elapsed, e),
        }

        result
    }
}
