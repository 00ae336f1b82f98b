//! Core types for agent-rs
//!
//! This crate defines the error taxonomy shared by every layer and the
//! [`ResponseEvent`] stream items produced when an agent runs.

pub mod error;
pub mod events;

pub use error::{Error, Result};
pub use events::{NextAction, ReasoningStep, ResponseEvent, RunOutput, ToolCallRecord};
