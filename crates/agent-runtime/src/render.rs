//! Terminal rendering of a run
//!
//! Streamed text is written as it arrives; everything else is drawn as
//! `comfy-table` panels.

use agent_core::{Error, ReasoningStep, ResponseEvent, RunOutput, ToolCallRecord};
use comfy_table::{Cell, ContentArrangement, Table, presets::UTF8_FULL};
use std::io::{self, Write};

const PANEL_WIDTH: u16 = 100;

/// What the renderer shows besides the answer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderOptions {
    /// Trace lines for each tool call and a summary table at the end
    pub show_tool_calls: bool,
    /// A panel for every reasoning step
    pub show_full_reasoning: bool,
}

/// Writes run events to any [`Write`] sink
pub struct Renderer<W: Write> {
    out: W,
    options: RenderOptions,
    streamed_text: bool,
    reasoning_shown: usize,
}

impl<W: Write> Renderer<W> {
    /// Create a renderer
    pub fn new(out: W, options: RenderOptions) -> Self {
        Self {
            out,
            options,
            streamed_text: false,
            reasoning_shown: 0,
        }
    }

    /// Show the query being answered
    pub fn query(&mut self, message: &str) -> io::Result<()> {
        writeln!(self.out, "{}", panel("Message", message))?;
        self.out.flush()
    }

    /// Render one event
    pub fn event(&mut self, event: &ResponseEvent) -> io::Result<()> {
        match event {
            ResponseEvent::ContentDelta { text } => {
                if !self.streamed_text {
                    self.streamed_text = true;
                    writeln!(self.out, "Response:")?;
                }
                write!(self.out, "{text}")?;
            }
            ResponseEvent::ToolCallStarted { name, arguments, .. } if self.options.show_tool_calls => {
                let record = ToolCallRecord {
                    id: String::new(),
                    name: name.clone(),
                    arguments: arguments.clone(),
                    result: None,
                    error: None,
                    duration_ms: 0,
                };
                self.break_line()?;
                writeln!(self.out, "• Running: {}", record.signature())?;
            }
            ResponseEvent::ToolCallCompleted(record) if self.options.show_tool_calls => {
                match &record.error {
                    Some(error) => writeln!(self.out, "  ✗ {} failed: {error}", record.name)?,
                    None => writeln!(
                        self.out,
                        "  ✓ {} ({} ms)",
                        record.name, record.duration_ms
                    )?,
                }
            }
            ResponseEvent::ReasoningStep(step) if self.options.show_full_reasoning => {
                self.reasoning(step)?;
            }
            ResponseEvent::RunCompleted(output) => self.completed(output)?,
            _ => {}
        }
        self.out.flush()
    }

    /// Report a failed run
    pub fn error(&mut self, error: &Error) -> io::Result<()> {
        self.break_line()?;
        writeln!(self.out, "{}", panel("Error", &error.to_string()))?;
        self.out.flush()
    }

    /// Give back the sink
    pub fn into_inner(self) -> W {
        self.out
    }

    fn completed(&mut self, output: &RunOutput) -> io::Result<()> {
        if self.options.show_full_reasoning {
            // Non-streamed runs deliver their steps only here
            let pending: Vec<ReasoningStep> =
                output.reasoning_steps.iter().skip(self.reasoning_shown).cloned().collect();
            for step in &pending {
                self.reasoning(step)?;
            }
        }

        let elapsed = format!("{:.1}s", output.elapsed_ms as f64 / 1000.0);
        if self.streamed_text {
            self.break_line()?;
            writeln!(self.out)?;
        } else {
            writeln!(
                self.out,
                "{}",
                panel(&format!("Response ({elapsed})"), &output.content)
            )?;
        }

        if self.options.show_tool_calls && !output.tool_calls.is_empty() {
            writeln!(self.out, "{}", tool_summary(&output.tool_calls))?;
        }

        writeln!(
            self.out,
            "Completed in {elapsed} · {} model turns · {} tool calls · {} tokens in / {} out",
            output.iterations,
            output.tool_calls.len(),
            output.input_tokens,
            output.output_tokens
        )
    }

    fn reasoning(&mut self, step: &ReasoningStep) -> io::Result<()> {
        self.reasoning_shown += 1;
        let mut body = String::new();
        if let Some(result) = &step.result {
            body.push_str(&format!("Result: {result}\n"));
        }
        body.push_str(&format!("Reasoning: {}\n", step.reasoning));
        if let Some(action) = &step.action {
            body.push_str(&format!("Action: {action}\n"));
        }
        body.push_str(&format!(
            "Next action: {}\nConfidence: {:.2}",
            step.next_action, step.confidence
        ));

        self.break_line()?;
        writeln!(
            self.out,
            "{}",
            panel(
                &format!("Reasoning step {}: {}", self.reasoning_shown, step.title),
                &body
            )
        )
    }

    /// End a partially streamed line before drawing anything else
    fn break_line(&mut self) -> io::Result<()> {
        if self.streamed_text {
            writeln!(self.out)?;
        }
        Ok(())
    }
}

fn panel(title: &str, body: &str) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(PANEL_WIDTH)
        .set_header(vec![Cell::new(title)])
        .add_row(vec![Cell::new(body)]);
    table
}

fn tool_summary(calls: &[ToolCallRecord]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(PANEL_WIDTH)
        .set_header(vec!["#", "Tool call", "Status", "Time (ms)"]);
    for (i, call) in calls.iter().enumerate() {
        let status = if call.is_error() { "error" } else { "ok" };
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(call.signature()),
            Cell::new(status),
            Cell::new(call.duration_ms),
        ]);
    }
    table
}
