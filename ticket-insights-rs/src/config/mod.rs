//! Configuration management for the inference client and pipeline
//!
//! Values come from a `ConfigProvider`, usually the process environment
//! (populated from `.env` by the binary). Every setting except the API key
//! has a default.

use std::collections::HashMap;
use std::env;
use std::fmt::Debug;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};
use crate::util::parse_duration;

/// Base trait for configuration providers
pub trait ConfigProvider: Send + Sync {
    /// Get a string configuration value
    fn get_string(&self, key: &str) -> Result<String>;
}

/// Extension methods for configuration providers
pub trait ConfigProviderExt: ConfigProvider {
    /// Get an integer configuration value
    fn get_int(&self, key: &str) -> Result<i64> {
        let value = self.get_string(key)?;
        value.trim().parse::<i64>().map_err(|e| {
            PipelineError::configuration(format!("Invalid integer for key {}: {}", key, e))
        })
    }

    /// Get a duration value such as `30s`, `500ms` or bare seconds
    fn get_duration(&self, key: &str) -> Result<Duration> {
        let value = self.get_string(key)?;
        parse_duration(&value).ok_or_else(|| {
            PipelineError::configuration(format!("Invalid duration for key {}: {}", key, value))
        })
    }

    /// Get a string configuration value with a default
    fn get_string_or(&self, key: &str, default: &str) -> String {
        self.get_string(key).unwrap_or_else(|_| default.to_string())
    }

    /// Get an integer configuration value with a default
    ///
    /// A present but malformed value is an error rather than silently defaulted.
    fn get_int_or(&self, key: &str, default: i64) -> Result<i64> {
        match self.get_string(key) {
            Ok(_) => self.get_int(key),
            Err(_) => Ok(default),
        }
    }

    /// Get a duration value with a default
    fn get_duration_or(&self, key: &str, default: Duration) -> Result<Duration> {
        match self.get_string(key) {
            Ok(_) => self.get_duration(key),
            Err(_) => Ok(default),
        }
    }
}

impl<T: ConfigProvider + ?Sized> ConfigProviderExt for T {}

/// Environment variable based configuration provider
#[derive(Debug, Clone, Default)]
pub struct EnvConfigProvider {
    /// Optional prefix for environment variables
    prefix: Option<String>,

    /// Optional namespace for variables (e.g., "STAGING")
    namespace: Option<String>,
}

impl EnvConfigProvider {
    /// Create a new environment variable config provider
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a prefix for environment variables
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Set a namespace for environment variables
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Format a configuration key as an environment variable
    fn format_key(&self, key: &str) -> String {
        let mut env_key = String::new();

        if let Some(ref prefix) = self.prefix {
            env_key.push_str(prefix);
            env_key.push('_');
        }

        if let Some(ref namespace) = self.namespace {
            env_key.push_str(namespace);
            env_key.push('_');
        }

        env_key.push_str(
            &key.to_uppercase()
                .replace(|c: char| !c.is_ascii_alphanumeric(), "_"),
        );

        env_key
    }
}

impl ConfigProvider for EnvConfigProvider {
    fn get_string(&self, key: &str) -> Result<String> {
        let env_key = self.format_key(key);

        env::var(&env_key).map_err(|e| match e {
            env::VarError::NotPresent => {
                PipelineError::configuration(format!("Environment variable not set: {}", env_key))
            }
            env::VarError::NotUnicode(_) => PipelineError::configuration(format!(
                "Environment variable is not valid unicode: {}",
                env_key
            )),
        })
    }
}

/// In-memory config provider for testing or static configuration
#[derive(Debug, Clone, Default)]
pub struct MemoryConfigProvider {
    values: HashMap<String, String>,
}

impl MemoryConfigProvider {
    /// Create a new empty memory config provider
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a memory config provider with initial values
    pub fn with_values(values: HashMap<String, String>) -> Self {
        Self { values }
    }

    /// Set a configuration value
    pub fn set<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: ToString,
    {
        self.values.insert(key.into(), value.to_string());
    }
}

impl ConfigProvider for MemoryConfigProvider {
    fn get_string(&self, key: &str) -> Result<String> {
        self.values.get(key).cloned().ok_or_else(|| {
            PipelineError::configuration(format!("Configuration key not found: {}", key))
        })
    }
}

/// Global default configuration provider (unprefixed environment)
pub static DEFAULT_PROVIDER: Lazy<Arc<EnvConfigProvider>> =
    Lazy::new(|| Arc::new(EnvConfigProvider::new()));

/// Trait for validated configuration sections
pub trait ServiceConfig: Debug + Send + Sync {
    /// Validate this configuration
    fn validate(&self) -> Result<()>;

    /// Section name used in error messages
    fn service_name(&self) -> &str;
}

pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
pub const DEFAULT_MODEL: &str = "claude-haiku-4-5";
pub const DEFAULT_API_VERSION: &str = "2023-06-01";

/// Settings for the Anthropic Messages API client
#[derive(Clone, Serialize, Deserialize)]
pub struct InferenceConfig {
    /// API key sent as `x-api-key`
    pub api_key: String,

    /// Base URL (can be changed for proxies and tests)
    pub base_url: String,

    /// Model identifier
    pub model: String,

    /// Value of the `anthropic-version` header
    pub api_version: String,

    /// Transport-level timeout of the HTTP client
    #[serde(with = "duration_secs")]
    pub http_timeout: Duration,

    /// Total attempts per call, including the first
    pub max_attempts: u32,
}

impl Debug for InferenceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferenceConfig")
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_version", &self.api_version)
            .field("http_timeout", &self.http_timeout)
            .field("max_attempts", &self.max_attempts)
            .finish()
    }
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            http_timeout: Duration::from_secs(120),
            max_attempts: 3,
        }
    }
}

impl InferenceConfig {
    /// Load configuration from a config provider
    pub fn from_provider<P: ConfigProvider + ?Sized>(provider: &P) -> Result<Self> {
        let defaults = Self::default();

        let config = Self {
            api_key: provider.get_string("anthropic_api_key")?,
            base_url: provider.get_string_or("anthropic_base_url", &defaults.base_url),
            model: provider.get_string_or("anthropic_model", &defaults.model),
            api_version: provider.get_string_or("anthropic_version", &defaults.api_version),
            http_timeout: provider
                .get_duration_or("inference_http_timeout", defaults.http_timeout)?,
            max_attempts: non_negative(
                "inference_max_attempts",
                provider.get_int_or("inference_max_attempts", defaults.max_attempts as i64)?,
            )? as u32,
        };

        config.validate()?;
        Ok(config)
    }
}

impl ServiceConfig for InferenceConfig {
    fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(PipelineError::configuration("Anthropic API key is required"));
        }

        url::Url::parse(&self.base_url).map_err(|e| {
            PipelineError::configuration(format!("Invalid base URL {}: {}", self.base_url, e))
        })?;

        if self.model.is_empty() {
            return Err(PipelineError::configuration("Model name is required"));
        }

        if self.max_attempts == 0 {
            return Err(PipelineError::configuration("max_attempts must be at least 1"));
        }

        Ok(())
    }

    fn service_name(&self) -> &str {
        "anthropic"
    }
}

/// Settings for the pipeline stages and their storage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Root of all caches and reports
    pub data_dir: PathBuf,

    /// Ticket export (CSV, or a JSON array when named `.json`)
    pub tickets_file: PathBuf,

    /// Gate capacity for the extraction fan-out
    pub max_concurrent: usize,

    /// Hard timeout applied to each inference attempt
    #[serde(with = "duration_secs")]
    pub request_timeout: Duration,

    pub extract_max_tokens: u32,
    pub summary_max_tokens: u32,
    pub report_max_tokens: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let data_dir = PathBuf::from("data");
        Self {
            tickets_file: data_dir.join("tickets.csv"),
            data_dir,
            max_concurrent: 10,
            request_timeout: Duration::from_secs(60),
            extract_max_tokens: 1024,
            summary_max_tokens: 2048,
            report_max_tokens: 4096,
        }
    }
}

impl PipelineConfig {
    /// Config rooted at `data_dir` with every other setting defaulted
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        Self {
            tickets_file: data_dir.join("tickets.csv"),
            data_dir,
            ..Self::default()
        }
    }

    /// Load configuration from a config provider
    pub fn from_provider<P: ConfigProvider + ?Sized>(provider: &P) -> Result<Self> {
        let defaults = Self::default();
        let data_dir = PathBuf::from(provider.get_string_or("pipeline_data_dir", "data"));
        let tickets_file = provider
            .get_string("pipeline_tickets_file")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_dir.join("tickets.csv"));

        let int = |key: &str, default: u32| -> Result<u32> {
            non_negative(key, provider.get_int_or(key, default as i64)?).map(|v| v as u32)
        };

        let config = Self {
            data_dir,
            tickets_file,
            max_concurrent: int("pipeline_max_concurrent", defaults.max_concurrent as u32)?
                as usize,
            request_timeout: provider
                .get_duration_or("pipeline_request_timeout", defaults.request_timeout)?,
            extract_max_tokens: int("pipeline_extract_max_tokens", defaults.extract_max_tokens)?,
            summary_max_tokens: int("pipeline_summary_max_tokens", defaults.summary_max_tokens)?,
            report_max_tokens: int("pipeline_report_max_tokens", defaults.report_max_tokens)?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Dated cache of per-ticket analyses
    pub fn analyses_dir(&self) -> PathBuf {
        self.data_dir.join("analyses")
    }

    /// Flat cache of daily summaries
    pub fn summaries_dir(&self) -> PathBuf {
        self.data_dir.join("summaries")
    }

    /// Flat cache of reports plus rendered Markdown
    pub fn reports_dir(&self) -> PathBuf {
        self.data_dir.join("reports")
    }
}

impl ServiceConfig for PipelineConfig {
    fn validate(&self) -> Result<()> {
        if self.max_concurrent == 0 {
            return Err(PipelineError::configuration("max_concurrent must be at least 1"));
        }

        if self.request_timeout.is_zero() {
            return Err(PipelineError::configuration("request_timeout must be positive"));
        }

        for (name, value) in [
            ("extract_max_tokens", self.extract_max_tokens),
            ("summary_max_tokens", self.summary_max_tokens),
            ("report_max_tokens", self.report_max_tokens),
        ] {
            if value == 0 {
                return Err(PipelineError::configuration(format!("{} must be at least 1", name)));
            }
        }

        Ok(())
    }

    fn service_name(&self) -> &str {
        "pipeline"
    }
}

fn non_negative(key: &str, value: i64) -> Result<i64> {
    if value < 0 || value > u32::MAX as i64 {
        return Err(PipelineError::configuration(format!(
            "Value for key {} out of range: {}",
            key, value
        )));
    }
    Ok(value)
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        if !secs.is_finite() || secs < 0.0 {
            return Err(serde::de::Error::custom("duration must be a non-negative number"));
        }
        Ok(Duration::from_secs_f64(secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_config_provider() {
        let mut provider = MemoryConfigProvider::new();
        provider.set("key1", "value1");
        provider.set("key2", "123");

        assert_eq!(provider.get_string("key1").unwrap(), "value1");
        assert_eq!(provider.get_int("key2").unwrap(), 123);
        assert!(provider.get_string("key3").is_err());
    }

    #[test]
    fn test_env_config_provider_key_format() {
        let provider = EnvConfigProvider::new()
            .with_prefix("TEST")
            .with_namespace("CONFIG");

        assert_eq!(provider.format_key("anthropic_api_key"), "TEST_CONFIG_ANTHROPIC_API_KEY");
        assert_eq!(provider.format_key("base-url"), "TEST_CONFIG_BASE_URL");
        assert_eq!(EnvConfigProvider::new().format_key("pipeline_data_dir"), "PIPELINE_DATA_DIR");
    }

    #[test]
    fn test_inference_config_debug_redacts_key() {
        let config = InferenceConfig {
            api_key: "sk-ant-secret".to_string(),
            ..InferenceConfig::default()
        };
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("sk-ant-secret"));
    }
}
