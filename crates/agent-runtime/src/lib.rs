//! Agent runtime for agent-rs
//!
//! This crate runs the model/tool loop ([`AgentExecutor`]), composes the
//! system prompt, and exposes the [`Dispatcher`] that turns a [`Query`] into a
//! stream of events and renders it.

pub mod dispatcher;
pub mod executor;
pub mod prompt;
pub mod render;

// Re-export key types
pub use dispatcher::{Dispatcher, DispatcherBuilder, Query, assemble};
pub use executor::{AgentExecutor, AgentExecutorBuilder, ExecutorConfig, ResponseStream, RunOptions};
pub use prompt::{InstructionSet, build_system_prompt};
pub use render::{RenderOptions, Renderer};
