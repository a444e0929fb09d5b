//! Client builder implementation
//!
//! Assembles an `InferenceClient` from configuration, or around any
//! `InferenceService` implementation.

use std::sync::Arc;
use std::time::Duration;

use crate::config::{ConfigProvider, InferenceConfig};
use crate::core::{InferenceClient, InferenceService};
use crate::error::{PipelineError, Result};
use crate::resilience::RetryConfig;
use crate::services::anthropic::AnthropicClient;

/// Unified builder for inference clients
#[derive(Default)]
pub struct ClientBuilder {
    /// Base settings; loaded from the environment if unset
    config: Option<InferenceConfig>,

    /// Pre-built service overriding the HTTP client
    service: Option<Arc<dyn InferenceService>>,

    /// Retry policy override
    retry_config: Option<RetryConfig>,

    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    timeout: Option<Duration>,
}

impl ClientBuilder {
    /// Create a new client builder with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an explicit configuration
    pub fn config(mut self, config: InferenceConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Start from configuration loaded through `provider`
    pub fn from_provider<P: ConfigProvider + ?Sized>(provider: &P) -> Result<Self> {
        Ok(Self::new().config(InferenceConfig::from_provider(provider)?))
    }

    /// Use an existing service instead of building the HTTP client
    pub fn service(mut self, service: Arc<dyn InferenceService>) -> Self {
        self.service = Some(service);
        self
    }

    /// Set the API key
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Set the base URL for the service
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the model
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set the HTTP transport timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Configure retry behavior
    pub fn retry_config(mut self, config: RetryConfig) -> Self {
        self.retry_config = Some(config);
        self
    }

    fn resolved_config(&mut self) -> Result<InferenceConfig> {
        let mut config = match self.config.take() {
            Some(config) => config,
            None if self.api_key.is_some() => InferenceConfig::default(),
            None => InferenceConfig::from_provider(&**crate::config::DEFAULT_PROVIDER)?,
        };

        if let Some(api_key) = self.api_key.take() {
            config.api_key = api_key;
        }
        if let Some(base_url) = self.base_url.take() {
            config.base_url = base_url;
        }
        if let Some(model) = self.model.take() {
            config.model = model;
        }
        if let Some(timeout) = self.timeout.take() {
            config.http_timeout = timeout;
        }

        Ok(config)
    }

    /// Build the HTTP-backed service with the configured settings
    pub fn build_service(mut self) -> Result<AnthropicClient> {
        let config = self.resolved_config()?;
        AnthropicClient::new_with_config(config)
    }

    /// Build the retrying client
    pub fn build(mut self) -> Result<InferenceClient> {
        let (service, max_attempts): (Arc<dyn InferenceService>, u32) = match self.service.take() {
            Some(service) => (service, RetryConfig::default().max_attempts),
            None => {
                let config = self.resolved_config()?;
                let attempts = config.max_attempts;
                (Arc::new(AnthropicClient::new_with_config(config)?), attempts)
            }
        };

        let retry = self
            .retry_config
            .take()
            .unwrap_or_else(|| RetryConfig::with_max_attempts(max_attempts));

        if retry.max_attempts == 0 {
            return Err(PipelineError::configuration("max_attempts must be at least 1"));
        }

        Ok(InferenceClient::with_retry(service, retry))
    }
}
