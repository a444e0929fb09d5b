//! Error handling for the ticket pipeline
//!
//! This module provides the crate-wide error type that:
//! - Categorizes failures by kind (network, auth, rate limit, recovery, cache, ...)
//! - Classifies inference failures as retryable or fatal
//! - Carries optional context for debugging
//! - Provides a convenient Result type alias

use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

pub mod mapping;

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Main error type for the pipeline
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Network or connection errors
    #[error("Network error: {0}")]
    Network(String),

    /// Request or response exceeded its deadline
    #[error("Timeout error: {0}")]
    Timeout(String),

    /// Rate limiting errors
    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),

    /// Transient server-side failures (5xx, overloaded)
    #[error("Server error: {0}")]
    Server(String),

    /// Authentication errors
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// Authorization errors (permission issues)
    #[error("Authorization error: {0}")]
    Authorization(String),

    /// Request validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Resource not found errors
    #[error("Not found: {0}")]
    NotFound(String),

    /// Other non-retryable responses from the inference service
    #[error("Service error: {0}")]
    Service(String),

    /// Response body parsing errors
    #[error("Parsing error: {0}")]
    Parsing(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// No JSON value could be recovered from model output
    #[error("Could not parse JSON. Last 500 chars: {excerpt}")]
    RecoveryFailed { excerpt: String },

    /// A normalized value still violated the record schema
    #[error("Normalization error: {0}")]
    Normalization(String),

    /// Cache read/write failures
    #[error("Cache error: {0}")]
    Cache(String),

    /// A stage was invoked with nothing to work on
    #[error("Empty input: {0}")]
    EmptyInput(String),

    /// Unexpected or internal errors
    #[error("Internal error: {0}")]
    Internal(String),

    /// Errors with additional context
    #[error("{inner}")]
    WithContext {
        inner: Box<PipelineError>,
        context: ErrorContext,
    },
}

impl PipelineError {
    /// Create a network error
    pub fn network(message: impl Into<String>) -> Self {
        PipelineError::Network(message.into())
    }

    /// Create a timeout error
    pub fn timeout(message: impl Into<String>) -> Self {
        PipelineError::Timeout(message.into())
    }

    /// Create a rate limit error
    pub fn rate_limit(message: impl Into<String>) -> Self {
        PipelineError::RateLimit(message.into())
    }

    /// Create a transient server error
    pub fn server(message: impl Into<String>) -> Self {
        PipelineError::Server(message.into())
    }

    /// Create an authentication error
    pub fn authentication(message: impl Into<String>) -> Self {
        PipelineError::Authentication(message.into())
    }

    /// Create an authorization error
    pub fn authorization(message: impl Into<String>) -> Self {
        PipelineError::Authorization(message.into())
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        PipelineError::Validation(message.into())
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        PipelineError::NotFound(message.into())
    }

    /// Create a non-retryable service error
    pub fn service(message: impl Into<String>) -> Self {
        PipelineError::Service(message.into())
    }

    /// Create a parsing error
    pub fn parsing(message: impl Into<String>) -> Self {
        PipelineError::Parsing(message.into())
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        PipelineError::Configuration(message.into())
    }

    /// Create a recovery failure from the text that could not be parsed.
    ///
    /// Only the trailing 500 characters are kept.
    pub fn recovery_failed(text: &str) -> Self {
        PipelineError::RecoveryFailed {
            excerpt: crate::util::tail_chars(text, 500).to_string(),
        }
    }

    /// Create a normalization error
    pub fn normalization(message: impl Into<String>) -> Self {
        PipelineError::Normalization(message.into())
    }

    /// Create a cache error
    pub fn cache(message: impl Into<String>) -> Self {
        PipelineError::Cache(message.into())
    }

    /// Create an empty input error
    pub fn empty_input(message: impl Into<String>) -> Self {
        PipelineError::EmptyInput(message.into())
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        PipelineError::Internal(message.into())
    }

    /// Add context to an existing error
    pub fn with_context(self, context: ErrorContext) -> Self {
        PipelineError::WithContext {
            inner: Box::new(self),
            context,
        }
    }

    /// Add a single context key/value to an existing error
    pub fn with_context_value(self, key: impl Into<String>, value: impl fmt::Display) -> Self {
        let mut context = ErrorContext::new();
        context.add(key, value);
        self.with_context(context)
    }

    /// The error without any context wrappers
    pub fn root(&self) -> &PipelineError {
        match self {
            PipelineError::WithContext { inner, .. } => inner.root(),
            other => other,
        }
    }

    /// Get the HTTP status code if available
    pub fn status_code(&self) -> Option<u16> {
        match self {
            PipelineError::WithContext { context, inner } => {
                context.status_code.or_else(|| inner.status_code())
            }
            _ => None,
        }
    }

    /// Get the service-specific error type if available
    pub fn error_code(&self) -> Option<&str> {
        match self {
            PipelineError::WithContext { context, .. } => context.error_code.as_deref(),
            _ => None,
        }
    }

    /// Check if this is a retryable error
    pub fn is_retryable(&self) -> bool {
        match self {
            PipelineError::Network(_) => true,
            PipelineError::Timeout(_) => true,
            PipelineError::RateLimit(_) => true,
            PipelineError::Server(_) => true,
            PipelineError::WithContext { inner, .. } => inner.is_retryable(),
            _ => false,
        }
    }

    /// Check if this is a permanent error (not retryable)
    pub fn is_permanent(&self) -> bool {
        !self.is_retryable()
    }
}

/// Error context information
#[derive(Debug, Clone)]
pub struct ErrorContext {
    /// Component that generated the error
    pub service: String,

    /// When the error was observed
    pub timestamp: Option<chrono::DateTime<chrono::Utc>>,

    /// HTTP status code if applicable
    pub status_code: Option<u16>,

    /// Service-specific error type
    pub error_code: Option<String>,

    /// Request ID for tracing
    pub request_id: Option<String>,

    /// Additional context data
    pub data: HashMap<String, String>,
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self {
            service: "unknown".to_string(),
            timestamp: Some(chrono::Utc::now()),
            status_code: None,
            error_code: None,
            request_id: None,
            data: HashMap::new(),
        }
    }
}

impl ErrorContext {
    /// Create a new error context
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new error context for a specific service
    pub fn for_service(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            ..Self::default()
        }
    }

    /// Add an HTTP status code
    pub fn status_code(mut self, code: u16) -> Self {
        self.status_code = Some(code);
        self
    }

    /// Add an error code
    pub fn error_code(mut self, code: impl Into<String>) -> Self {
        self.error_code = Some(code.into());
        self
    }

    /// Add a request ID
    pub fn request_id(mut self, id: impl Into<String>) -> Self {
        self.request_id = Some(id.into());
        self
    }

    /// Add a context value
    pub fn add<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: fmt::Display,
    {
        self.data.insert(key.into(), value.to_string());
    }

    /// Add a context value and return self (builder pattern)
    pub fn with<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: fmt::Display,
    {
        self.add(key, value);
        self
    }
}

/// Convert reqwest errors to PipelineError
impl From<reqwest::Error> for PipelineError {
    fn from(err: reqwest::Error) -> Self {
        let context = ErrorContext::for_service("http_client");

        let error = if err.is_timeout() {
            PipelineError::timeout(format!("Request timed out: {}", err))
        } else if err.is_connect() {
            PipelineError::network(format!("Connection error: {}", err))
        } else if err.is_decode() {
            PipelineError::parsing(format!("Response decode error: {}", err))
        } else if err.is_builder() {
            PipelineError::validation(format!("Invalid request: {}", err))
        } else {
            // Body/transport failures mid-request are worth another attempt
            PipelineError::network(format!("HTTP client error: {}", err))
        };

        if let Some(status) = err.status() {
            error.with_context(context.status_code(status.as_u16()))
        } else {
            error.with_context(context)
        }
    }
}

/// Convert serde_json errors to PipelineError
impl From<serde_json::Error> for PipelineError {
    fn from(err: serde_json::Error) -> Self {
        PipelineError::parsing(format!("JSON error: {}", err))
    }
}

impl From<std::io::Error> for PipelineError {
    fn from(err: std::io::Error) -> Self {
        PipelineError::cache(format!("I/O error: {}", err))
    }
}
