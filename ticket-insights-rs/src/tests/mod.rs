//! Component and integration tests for the ticket insights crate
//!
//! `support` holds the stub inference services shared by the stage tests.

pub mod support;

pub mod client_tests;
pub mod summarize_tests;
