//! # Ticket Insights
//!
//! Turns raw support tickets into per-ticket analyses, per-day summaries and
//! a multi-day executive report by delegating language understanding to a
//! text-inference service.
//!
//! This crate provides:
//!
//! - A retrying, concurrency-gated inference client (`InferenceClient`)
//!   backed by the Anthropic Messages API
//! - Recovery of JSON values from fenced, chatty or truncated model output
//! - Normalization of loosely shaped output into fixed record types
//! - Flat and date-partitioned file caches that make every stage resumable
//! - The three pipeline stages and a `Pipeline` that runs them in order
//!
//! ## Architecture
//!
//! - `InferenceService`: one completion attempt against a backend
//! - `Resilience`: retry with backoff, per-attempt timeout, gate permits
//! - `recover_json` / `normalize_*`: text → JSON value → typed record
//! - `ResultCache` / `DatedCache`: key → pretty JSON file
//! - `Extractor`, `Summarizer`, `Reporter`: the stages
//! - `PipelineError`: the error taxonomy, with retryability

pub mod core;
pub use core::{ClientBuilder, CompletionRequest, InferenceClient, InferenceService};

pub mod services;
pub use services::anthropic;

pub mod error;
pub use error::{ErrorContext, PipelineError, Result};

pub mod resilience;
pub use resilience::{Resilience, RetryConfig, RetryExecutor};

pub mod config;
pub use config::{ConfigProvider, InferenceConfig, PipelineConfig, ServiceConfig};

pub mod cache;
pub use cache::{CacheLookup, DatedCache, ResultCache};

pub mod models;
pub use models::{DailySummary, Report, TicketAnalysis, TicketRecord};

pub mod normalize;
pub mod pipeline;
pub use pipeline::{Extractor, Pipeline, PipelineOutput, Reporter, Summarizer};

pub mod prompts;
pub mod recovery;
pub use recovery::{recover_json, recover_json_with_method};

pub mod render;
pub mod source;

pub mod util;

#[cfg(test)]
mod tests;

/// Create a new default client builder
pub fn client() -> core::ClientBuilder {
    core::ClientBuilder::new()
}
