//! Service-specific client implementations

pub mod anthropic;
mod common;

pub use common::UserAgent;
