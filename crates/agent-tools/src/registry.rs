//! Tool registry for looking up callable functions by name

use crate::{Tool, ToolDescriptor};
use agent_core::{Error, Result};
use std::collections::HashMap;
use std::sync::Arc;

/// Ordered set of tools, filled once and then only read
///
/// Iteration follows registration order, so the function list offered to the
/// model is stable from run to run.
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    /// Create a new tool registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every function of every descriptor, in order
    pub fn from_descriptors(descriptors: &[ToolDescriptor]) -> Result<Self> {
        let mut registry = Self::new();
        for descriptor in descriptors {
            for tool in descriptor.tools() {
                registry.register(Arc::clone(tool))?;
            }
        }
        Ok(registry)
    }

    /// Register a tool
    ///
    /// Names must be unique; a second tool with the same name is rejected.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<()> {
        let name = tool.name().to_string();
        if self.index.contains_key(&name) {
            return Err(Error::InitializationFailed(format!(
                "Tool '{name}' is registered twice"
            )));
        }
        self.index.insert(name, self.tools.len());
        self.tools.push(tool);
        Ok(())
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.index.get(name).map(|&i| Arc::clone(&self.tools[i]))
    }

    /// List all registered tools in registration order
    pub fn list_tools(&self) -> Vec<Arc<dyn Tool>> {
        self.tools.clone()
    }

    /// Get the number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.tools.iter().map(|t| t.name()))
            .finish()
    }
}
