//! Shared utilities for research-agents
//!
//! This crate provides the functionality every other crate in the workspace
//! leans on: tracing setup and the environment-driven application
//! configuration (credentials, workflow limits, server address).

pub mod config;
pub mod logging;

pub use config::{
    AppConfig, ConfigError, LlmBackend, LlmSettings, SearchSettings, ServerSettings,
    WorkflowLimits,
};
pub use logging::{init_tracing, init_tracing_with_filter};
