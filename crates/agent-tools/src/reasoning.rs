//! Reasoning toolkit: lets the model write down its thinking as tool calls
//!
//! `think` records a plan before acting, `analyze` evaluates a result after
//! acting. Both append to a shared history that is cleared when a run starts,
//! and both return the full history so far so the model can review it.

use crate::{Tool, ToolDescriptor};
use agent_core::{Error, NextAction, ReasoningStep, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use std::fmt::Write as _;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

/// Toolkit name as shown in traces
pub const REASONING_TOOLKIT: &str = "reasoning_tools";

const DEFAULT_CONFIDENCE: f64 = 0.8;

const INSTRUCTIONS: &str = "\
You have access to the `think` and `analyze` tools to work through problems step by step.

1. **Think** (scratchpad):
    - Use `think` before acting: break the request down, decide which data you need and plan the next call.
    - Give each step a short title and a confidence between 0 and 1.

2. **Analyze** (evaluation):
    - Use `analyze` after every tool result: what does it show, is it enough, does the plan still hold?
    - Set `next_action` to `continue` to gather more, `validate` to double-check, or `final_answer` when ready.

Iterate think -> act -> analyze until the answer is complete, then write the final report.";

/// Shared step history for one run
#[derive(Debug, Default, Clone)]
pub struct ReasoningTools {
    steps: Arc<Mutex<Vec<ReasoningStep>>>,
}

impl ReasoningTools {
    /// Create an empty toolkit
    pub fn new() -> Self {
        Self::default()
    }

    /// Package `think` and `analyze` with their prompt instructions
    pub fn descriptor(&self) -> ToolDescriptor {
        let tools: Vec<Arc<dyn Tool>> = vec![
            Arc::new(ThinkTool {
                history: self.clone(),
            }),
            Arc::new(AnalyzeTool {
                history: self.clone(),
            }),
        ];
        ToolDescriptor::new(REASONING_TOOLKIT, tools).with_instructions(INSTRUCTIONS)
    }

    /// Steps recorded in the current run
    pub fn steps(&self) -> Vec<ReasoningStep> {
        self.steps
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn clear(&self) {
        self.steps
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Append a step and render the whole history
    fn record(&self, step: ReasoningStep) -> String {
        let mut steps = self.steps.lock().unwrap_or_else(PoisonError::into_inner);
        debug!(title = %step.title, count = steps.len() + 1, "Recorded reasoning step");
        steps.push(step);
        render_history(&steps)
    }
}

fn render_history(steps: &[ReasoningStep]) -> String {
    let mut out = String::new();
    for (i, step) in steps.iter().enumerate() {
        let _ = writeln!(out, "Step {}:", i + 1);
        let _ = writeln!(out, "Title: {}", step.title);
        if let Some(result) = &step.result {
            let _ = writeln!(out, "Result: {result}");
        }
        let _ = writeln!(out, "Reasoning: {}", step.reasoning);
        if let Some(action) = &step.action {
            let _ = writeln!(out, "Action: {action}");
        }
        let _ = writeln!(out, "Next action: {}", step.next_action);
        let _ = writeln!(out, "Confidence: {:.2}", step.confidence);
        out.push('\n');
    }
    out.trim_end().to_string()
}

fn confidence(value: Option<f64>) -> f64 {
    value.unwrap_or(DEFAULT_CONFIDENCE).clamp(0.0, 1.0)
}

fn parse<T: for<'de> Deserialize<'de>>(tool: &str, params: &Value) -> Result<T> {
    serde_json::from_value(params.clone())
        .map_err(|e| Error::ProcessingFailed(format!("Invalid arguments for {tool}: {e}")))
}

#[derive(Debug, Deserialize)]
struct ThinkParams {
    title: String,
    thought: String,
    #[serde(default)]
    action: Option<String>,
    #[serde(default)]
    confidence: Option<f64>,
}

impl From<ThinkParams> for ReasoningStep {
    fn from(p: ThinkParams) -> Self {
        ReasoningStep {
            title: p.title,
            reasoning: p.thought,
            action: p.action,
            result: None,
            next_action: NextAction::Continue,
            confidence: confidence(p.confidence),
        }
    }
}

#[derive(Debug, Deserialize)]
struct AnalyzeParams {
    title: String,
    result: String,
    analysis: String,
    #[serde(default)]
    next_action: Option<NextAction>,
    #[serde(default)]
    confidence: Option<f64>,
}

impl From<AnalyzeParams> for ReasoningStep {
    fn from(p: AnalyzeParams) -> Self {
        ReasoningStep {
            title: p.title,
            reasoning: p.analysis,
            action: None,
            result: Some(p.result),
            next_action: p.next_action.unwrap_or_default(),
            confidence: confidence(p.confidence),
        }
    }
}

struct ThinkTool {
    history: ReasoningTools,
}

#[async_trait]
impl Tool for ThinkTool {
    async fn execute(&self, params: Value) -> Result<Value> {
        let step: ReasoningStep = parse::<ThinkParams>(self.name(), &params)?.into();
        Ok(Value::String(self.history.record(step)))
    }

    fn name(&self) -> &'static str {
        "think"
    }

    fn description(&self) -> &'static str {
        "Use this tool as a scratchpad to plan the next step before acting. \
         Record what you know, what you still need and which tool you will call next."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "title": {"type": "string", "description": "A concise title for this step"},
                "thought": {"type": "string", "description": "Your detailed thought for this step"},
                "action": {"type": "string", "description": "What you will do after this step"},
                "confidence": {"type": "number", "description": "Confidence in this step, 0.0 to 1.0"}
            },
            "required": ["title", "thought"]
        })
    }

    fn reasoning_step(&self, params: &Value) -> Option<ReasoningStep> {
        parse::<ThinkParams>(self.name(), params).ok().map(Into::into)
    }

    fn begin_run(&self) {
        self.history.clear();
    }
}

struct AnalyzeTool {
    history: ReasoningTools,
}

#[async_trait]
impl Tool for AnalyzeTool {
    async fn execute(&self, params: Value) -> Result<Value> {
        let step: ReasoningStep = parse::<AnalyzeParams>(self.name(), &params)?.into();
        Ok(Value::String(self.history.record(step)))
    }

    fn name(&self) -> &'static str {
        "analyze"
    }

    fn description(&self) -> &'static str {
        "Use this tool to evaluate the result of a previous action and decide whether to \
         continue, validate, or give the final answer."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "title": {"type": "string", "description": "A concise title for this analysis"},
                "result": {"type": "string", "description": "The outcome being analyzed"},
                "analysis": {"type": "string", "description": "Your evaluation of the result"},
                "next_action": {
                    "type": "string",
                    "enum": ["continue", "validate", "final_answer"],
                    "description": "What to do next"
                },
                "confidence": {"type": "number", "description": "Confidence in this analysis, 0.0 to 1.0"}
            },
            "required": ["title", "result", "analysis"]
        })
    }

    fn reasoning_step(&self, params: &Value) -> Option<ReasoningStep> {
        parse::<AnalyzeParams>(self.name(), params).ok().map(Into::into)
    }

    fn begin_run(&self) {
        self.history.clear();
    }
}
