//! Events emitted while an agent run is in progress

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// What the model intends to do after a reasoning step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NextAction {
    /// Keep gathering information
    #[default]
    Continue,
    /// Double-check the current conclusion
    Validate,
    /// Ready to answer
    FinalAnswer,
}

impl std::fmt::Display for NextAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Continue => "continue",
            Self::Validate => "validate",
            Self::FinalAnswer => "final_answer",
        };
        f.write_str(s)
    }
}

/// One recorded step of the model's explicit reasoning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReasoningStep {
    /// Short label for the step
    pub title: String,
    /// The thought or analysis text
    pub reasoning: String,
    /// Planned action, if the model stated one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    /// Outcome being analysed, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    /// Where the model goes next
    #[serde(default)]
    pub next_action: NextAction,
    /// Self-reported confidence in `[0, 1]`
    pub confidence: f64,
}

/// A completed tool invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRecord {
    /// Call identifier
    pub id: String,
    /// Tool name
    pub name: String,
    /// Arguments the model supplied
    pub arguments: Value,
    /// Serialized result on success
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    /// Error message on failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Wall time spent in the tool
    pub duration_ms: u64,
}

impl ToolCallRecord {
    /// Whether the invocation failed
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// `name(key=value, ...)` rendering of the call
    pub fn signature(&self) -> String {
        let args = match &self.arguments {
            Value::Object(map) => map
                .iter()
                .map(|(k, v)| match v {
                    Value::String(s) => format!("{k}={s}"),
                    other => format!("{k}={other}"),
                })
                .collect::<Vec<_>>()
                .join(", "),
            Value::Null => String::new(),
            other => other.to_string(),
        };
        format!("{}({args})", self.name)
    }
}

/// Final outcome of a run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunOutput {
    /// The final answer text
    pub content: String,
    /// Every tool invocation, in execution order
    pub tool_calls: Vec<ToolCallRecord>,
    /// Every reasoning step, in the order recorded
    pub reasoning_steps: Vec<ReasoningStep>,
    /// Model turns taken
    pub iterations: usize,
    /// Prompt tokens across all turns
    pub input_tokens: usize,
    /// Generated tokens across all turns
    pub output_tokens: usize,
    /// Wall time for the whole run
    pub elapsed_ms: u64,
}

/// A unit of output produced while a query runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ResponseEvent {
    /// Incremental answer text
    ContentDelta {
        /// Text fragment
        text: String,
    },
    /// A tool is about to run
    ToolCallStarted {
        /// Call identifier
        id: String,
        /// Tool name
        name: String,
        /// Arguments the model supplied
        arguments: Value,
    },
    /// A tool finished, successfully or not
    ToolCallCompleted(ToolCallRecord),
    /// The model recorded a reasoning step
    ReasoningStep(ReasoningStep),
    /// The run finished; always the last event
    RunCompleted(RunOutput),
}

impl ResponseEvent {
    /// Whether this event marks the end of the run
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::RunCompleted(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tool_call_signature() {
        let record = ToolCallRecord {
            id: "call_1".to_string(),
            name: "get_historical_stock_prices".to_string(),
            arguments: json!({"symbol": "NVDA", "period": "1mo"}),
            result: Some("[]".to_string()),
            error: None,
            duration_ms: 12,
        };
        assert_eq!(
            record.signature(),
            "get_historical_stock_prices(period=1mo, symbol=NVDA)"
        );
        assert!(!record.is_error());
    }

    #[test]
    fn test_event_tagging() {
        let event = ResponseEvent::ContentDelta {
            text: "| Metric |".to_string(),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["event"], "content_delta");
        assert_eq!(value["text"], "| Metric |");
    }

    #[test]
    fn test_reasoning_step_defaults() {
        let step: ReasoningStep = serde_json::from_value(json!({
            "title": "Plan",
            "reasoning": "Fetch the price first",
            "confidence": 0.9
        }))
        .unwrap();
        assert_eq!(step.next_action, NextAction::Continue);
        assert!(step.action.is_none());
        assert_eq!(NextAction::FinalAnswer.to_string(), "final_answer");
    }

    #[test]
    fn test_terminal_event() {
        assert!(ResponseEvent::RunCompleted(RunOutput::default()).is_terminal());
        assert!(
            !ResponseEvent::ContentDelta {
                text: String::new()
            }
            .is_terminal()
        );
    }
}
