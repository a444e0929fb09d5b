//! Anthropic Messages API client
//!
//! Implements `InferenceService` over `POST {base_url}/v1/messages`.

mod models;
pub use models::*;

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::{header, Client};
use std::time::Duration;

use crate::config::{InferenceConfig, ServiceConfig, DEFAULT_PROVIDER};
use crate::core::{CompletionRequest, InferenceService};
use crate::error::{PipelineError, Result};
use crate::services::common::{build_http_client, parse_error_response, UserAgent};

const SERVICE_NAME: &str = "anthropic";

/// Anthropic Messages API client
#[derive(Debug, Clone)]
pub struct AnthropicClient {
    http_client: Client,
    config: InferenceConfig,
}

impl AnthropicClient {
    /// Create a client from environment configuration
    pub fn from_env() -> Result<Self> {
        Self::new_with_config(InferenceConfig::from_provider(&**DEFAULT_PROVIDER)?)
    }

    /// Create a client with explicit configuration
    pub fn new_with_config(config: InferenceConfig) -> Result<Self> {
        config.validate()?;

        let mut headers = header::HeaderMap::new();
        let mut api_key = header::HeaderValue::from_str(&config.api_key)
            .map_err(|e| PipelineError::configuration(format!("Invalid API key header: {}", e)))?;
        api_key.set_sensitive(true);
        headers.insert("x-api-key", api_key);
        headers.insert(
            "anthropic-version",
            header::HeaderValue::from_str(&config.api_version).map_err(|e| {
                PipelineError::configuration(format!("Invalid API version header: {}", e))
            })?,
        );

        let http_client = build_http_client(
            Some(UserAgent {
                extra: Some("anthropic-client".to_string()),
                ..UserAgent::default()
            }),
            Some(config.http_timeout),
            headers,
        )?;

        Ok(Self { http_client, config })
    }

    /// Create a new builder for the client
    pub fn builder() -> AnthropicClientBuilder {
        AnthropicClientBuilder::default()
    }

    /// The configuration in use
    pub fn config(&self) -> &InferenceConfig {
        &self.config
    }

    fn messages_url(&self) -> String {
        format!("{}/v1/messages", self.config.base_url.trim_end_matches('/'))
    }

    /// Send one Messages API request
    pub async fn create_message(&self, request: &MessagesRequest) -> Result<MessagesResponse> {
        let url = self.messages_url();
        debug!("Sending request to Anthropic: POST {}", url);

        let response = self.http_client.post(&url).json(request).send().await?;

        let status = response.status();
        if !status.is_success() {
            let error = parse_error_response(SERVICE_NAME, response).await;
            warn!("Anthropic request failed with {}: {}", status, error);
            return Err(error);
        }

        response
            .json::<MessagesResponse>()
            .await
            .map_err(|e| PipelineError::parsing(format!("Failed to parse response: {}", e)))
    }
}

#[async_trait]
impl InferenceService for AnthropicClient {
    fn name(&self) -> &str {
        SERVICE_NAME
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let body = MessagesRequest {
            model: self.config.model.clone(),
            max_tokens: request.max_tokens,
            messages: vec![Message::user(request.prompt.clone())],
        };

        let response = self.create_message(&body).await?;
        debug!(
            "Anthropic response {}: {} input / {} output tokens, stop_reason={:?}",
            response.id,
            response.usage.input_tokens,
            response.usage.output_tokens,
            response.stop_reason
        );

        response
            .first_text()
            .map(str::to_string)
            .ok_or_else(|| PipelineError::parsing("Response contained no text content"))
    }
}

/// Builder for the Anthropic client
#[derive(Default)]
pub struct AnthropicClientBuilder {
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    api_version: Option<String>,
    timeout: Option<Duration>,
}

impl AnthropicClientBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the API key
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Set the base URL
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Set the model
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set the `anthropic-version` header value
    pub fn api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = Some(version.into());
        self
    }

    /// Set the HTTP timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Build the client, starting from `config` and applying overrides
    pub fn build_with(self, mut config: InferenceConfig) -> Result<AnthropicClient> {
        if let Some(api_key) = self.api_key {
            config.api_key = api_key;
        }
        if let Some(base_url) = self.base_url {
            config.base_url = base_url;
        }
        if let Some(model) = self.model {
            config.model = model;
        }
        if let Some(version) = self.api_version {
            config.api_version = version;
        }
        if let Some(timeout) = self.timeout {
            config.http_timeout = timeout;
        }

        AnthropicClient::new_with_config(config)
    }

    /// Build the client from defaults and explicit overrides only
    pub fn build(self) -> Result<AnthropicClient> {
        self.build_with(InferenceConfig::default())
    }
}
