//! Tool trait definition

use agent_core::{ReasoningStep, Result};
use async_trait::async_trait;
use serde_json::Value;

/// Trait for functions the model can call
///
/// Each tool provides a name, a description and a JSON schema for its
/// input. Failures returned from [`Tool::execute`] are reported back to the
/// model; they do not end the run.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Execute the tool with given parameters
    ///
    /// # Arguments
    ///
    /// * `params` - Tool input as JSON value (should match input_schema)
    ///
    /// # Returns
    ///
    /// Tool output as JSON value
    async fn execute(&self, params: Value) -> Result<Value>;

    /// Get the tool's name
    ///
    /// Must be unique within a ToolRegistry and match the name in ToolDefinition
    fn name(&self) -> &str;

    /// Get the tool's description
    ///
    /// This description helps the LLM understand when to use this tool
    fn description(&self) -> &str;

    /// Get the tool's input schema (JSON Schema format)
    ///
    /// # Example
    ///
    /// ```
    /// use serde_json::json;
    ///
    /// let schema = json!({
    ///     "type": "object",
    ///     "properties": {
    ///         "symbol": { "type": "string", "description": "Ticker symbol" },
    ///         "period": { "type": "string", "enum": ["1d", "5d", "1mo", "1y"] }
    ///     },
    ///     "required": ["symbol"]
    /// });
    /// ```
    fn input_schema(&self) -> Value;

    /// The reasoning step a successful call with `params` records, if any
    fn reasoning_step(&self, _params: &Value) -> Option<ReasoningStep> {
        None
    }

    /// Called once at the start of every run, before the first model turn
    fn begin_run(&self) {}
}
