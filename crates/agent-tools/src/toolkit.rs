//! Toolkits: named groups of tools that are offered to the model together

use crate::Tool;
use std::collections::BTreeSet;
use std::sync::Arc;

/// A named group of callable functions plus optional prompt instructions
///
/// Built once during assembly and never modified afterwards.
#[derive(Clone)]
pub struct ToolDescriptor {
    name: String,
    capabilities: BTreeSet<String>,
    tools: Vec<Arc<dyn Tool>>,
    instructions: Option<String>,
}

impl ToolDescriptor {
    /// Create a descriptor whose capabilities are the function names
    pub fn new(name: impl Into<String>, tools: Vec<Arc<dyn Tool>>) -> Self {
        let capabilities = tools.iter().map(|t| t.name().to_string()).collect();
        Self {
            name: name.into(),
            capabilities,
            tools,
            instructions: None,
        }
    }

    /// Replace the advertised capability names
    pub fn with_capabilities<I, S>(mut self, capabilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.capabilities = capabilities.into_iter().map(Into::into).collect();
        self
    }

    /// Attach usage instructions for the system prompt
    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    /// Toolkit name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Enabled capability names
    pub fn capabilities(&self) -> &BTreeSet<String> {
        &self.capabilities
    }

    /// Whether the named capability is enabled
    pub fn has_capability(&self, capability: &str) -> bool {
        self.capabilities.contains(capability)
    }

    /// Callable functions, in the order they are offered
    pub fn tools(&self) -> &[Arc<dyn Tool>] {
        &self.tools
    }

    /// Names of the callable functions, in order
    pub fn function_names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    /// Prompt instructions, if the toolkit has any
    pub fn instructions(&self) -> Option<&str> {
        self.instructions.as_deref()
    }
}

impl std::fmt::Debug for ToolDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolDescriptor")
            .field("name", &self.name)
            .field("capabilities", &self.capabilities)
            .field("functions", &self.function_names())
            .field("has_instructions", &self.instructions.is_some())
            .finish()
    }
}
