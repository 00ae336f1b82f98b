//! Shared utilities for agent-rs
//!
//! This crate provides common functionality used across the agent-rs workspace:
//! process-wide settings hydrated from the environment (and an optional `.env`
//! file), credential loading, and logging setup.

pub mod config;
pub mod credential;
pub mod logging;

pub use config::{DotenvStatus, IgnoredSetting, LogFormat, LogSettings, Settings, settings};
pub use credential::{ConfigError, Credential, load_credential};
pub use logging::init_tracing;
