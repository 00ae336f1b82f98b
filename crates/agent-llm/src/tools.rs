//! Tool definition types for LLM tool use

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Function declaration offered to the model
///
/// The schema is plain JSON Schema; providers that accept only a subset
/// (Gemini) strip what they do not understand when encoding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Function name, unique across everything offered in one request
    pub name: String,

    /// Description of what the tool does
    pub description: String,

    /// JSON schema for the tool's input parameters
    pub input_schema: Value,
}

impl ToolDefinition {
    /// Create a new tool definition
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: Value,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
        }
    }
}

/// Helper module to build JSON schemas for tools
pub mod schema {
    use serde_json::{json, Value};

    /// Create a JSON schema for an object with properties
    ///
    /// # Example
    ///
    /// ```
    /// use agent_llm::tools::schema;
    /// use serde_json::json;
    ///
    /// let schema = schema::object(
    ///     json!({
    ///         "symbol": schema::string("Ticker symbol, e.g. NVDA"),
    ///         "num_stories": schema::integer("How many stories to return"),
    ///     }),
    ///     vec!["symbol"],
    /// );
    /// ```
    pub fn object(properties: Value, required: Vec<&str>) -> Value {
        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// String property schema
    ///
    /// # Example
    ///
    /// ```
    /// use agent_llm::tools::schema;
    ///
    /// let schema = schema::string("A text description");
    /// ```
    pub fn string(description: &str) -> Value {
        json!({
            "type": "string",
            "description": description,
        })
    }

    /// Number property schema
    ///
    /// # Example
    ///
    /// ```
    /// use agent_llm::tools::schema;
    ///
    /// let schema = schema::number("A numeric value");
    /// ```
    pub fn number(description: &str) -> Value {
        json!({
            "type": "number",
            "description": description,
        })
    }

    /// Integer property schema
    pub fn integer(description: &str) -> Value {
        json!({
            "type": "integer",
            "description": description,
        })
    }

    /// String property restricted to a fixed set of values
    pub fn string_enum(description: &str, values: &[&str]) -> Value {
        json!({
            "type": "string",
            "description": description,
            "enum": values,
        })
    }

    /// Boolean property schema
    pub fn boolean(description: &str) -> Value {
        json!({
            "type": "boolean",
            "description": description,
        })
    }

    /// Array property schema
    pub fn array(description: &str, items: Value) -> Value {
        json!({
            "type": "array",
            "description": description,
            "items": items,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_definition_creation() {
        let schema = schema::object(
            json!({
                "symbol": schema::string("Ticker symbol"),
            }),
            vec!["symbol"],
        );

        let tool = ToolDefinition::new(
            "get_current_stock_price",
            "Latest trading price for a ticker",
            schema.clone(),
        );
        assert_eq!(tool.name, "get_current_stock_price");
        assert_eq!(tool.input_schema["required"][0], "symbol");
        assert_eq!(tool.input_schema, schema);
    }

    #[test]
    fn test_schema_builders() {
        let str_schema = schema::string("test");
        assert_eq!(str_schema["type"], "string");

        let num_schema = schema::number("count");
        assert_eq!(num_schema["type"], "number");

        let period = schema::string_enum("Lookback", &["1d", "5d", "1mo"]);
        assert_eq!(period["type"], "string");
        assert_eq!(period["enum"][2], "1mo");
    }
}
