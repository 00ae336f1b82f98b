//! Tool management and execution framework for agent-rs
//!
//! This crate provides the [`Tool`] trait, toolkits that group tools with
//! prompt instructions, an ordered [`ToolRegistry`] and the built-in
//! reasoning toolkit.

pub mod reasoning;
pub mod registry;
pub mod tool;
pub mod toolkit;

pub use reasoning::ReasoningTools;
pub use registry::ToolRegistry;
pub use tool::Tool;
pub use toolkit::ToolDescriptor;
