//! Common utilities for service clients

use std::fmt;
use std::time::Duration;

use reqwest::{header, Client};

use crate::error::{mapping, ErrorContext, PipelineError, Result};

/// UserAgent structure for identifying the client to upstream services
#[derive(Debug, Clone)]
pub struct UserAgent {
    /// Application name
    pub app_name: String,

    /// Version string
    pub version: String,

    /// Optional extra info
    pub extra: Option<String>,
}

impl Default for UserAgent {
    fn default() -> Self {
        Self {
            app_name: "ticket-insights".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            extra: None,
        }
    }
}

impl fmt::Display for UserAgent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.app_name, self.version)?;

        if let Some(ref extra) = self.extra {
            write!(f, " ({})", extra)?;
        }

        Ok(())
    }
}

/// Build a standard HTTP client with the given default headers
pub fn build_http_client(
    user_agent: Option<UserAgent>,
    timeout: Option<Duration>,
    mut headers: header::HeaderMap,
) -> Result<Client> {
    let ua = user_agent.unwrap_or_default().to_string();

    headers.insert(
        header::USER_AGENT,
        header::HeaderValue::from_str(&ua)
            .map_err(|e| PipelineError::configuration(format!("Invalid user agent: {}", e)))?,
    );

    reqwest::Client::builder()
        .default_headers(headers)
        .timeout(timeout.unwrap_or_else(|| Duration::from_secs(120)))
        .gzip(true)
        .build()
        .map_err(|e| PipelineError::configuration(format!("Failed to build HTTP client: {}", e)))
}

/// Create error context for HTTP requests
pub fn create_error_context(service_name: &str, status: Option<reqwest::StatusCode>) -> ErrorContext {
    let mut context = ErrorContext::for_service(service_name);

    if let Some(status_code) = status {
        context = context.status_code(status_code.as_u16());
    }

    context
}

/// Parse an error response into the error taxonomy
pub async fn parse_error_response(service_name: &str, response: reqwest::Response) -> PipelineError {
    let status = response.status();
    let mut context = create_error_context(service_name, Some(status));

    if let Some(request_id) = response
        .headers()
        .get("request-id")
        .and_then(|v| v.to_str().ok())
    {
        context = context.request_id(request_id);
    }

    let body = match response.text().await {
        Ok(body) => body,
        Err(e) => format!("Failed to read error response: {}", e),
    };

    log::debug!(
        "{} returned {} ({}, retryable={}): {}",
        service_name,
        status,
        mapping::classify_http_error(status),
        mapping::is_retryable_status(status),
        crate::util::log_excerpt(&body, 300)
    );

    mapping::map_http_error(status, &body, &mut context).with_context(context)
}
