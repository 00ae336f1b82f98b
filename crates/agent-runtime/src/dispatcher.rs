//! Request dispatcher: one model, one set of toolkits, one persona
//!
//! Assembly is pure. Network I/O only starts when the stream returned by
//! [`Dispatcher::dispatch`] is polled.

use crate::executor::{AgentExecutor, ExecutorConfig, ResponseStream, RunOptions};
use crate::prompt::{InstructionSet, build_system_prompt};
use crate::render::{RenderOptions, Renderer};
use agent_core::{Error, ResponseEvent, Result, RunOutput};
use agent_llm::LLMProvider;
use agent_tools::{ToolDescriptor, ToolRegistry};
use futures::StreamExt;
use std::io::Write;
use std::sync::Arc;
use tracing::{debug, info};

/// A single request to the agent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    /// The user message
    pub message: String,
    /// Relay the answer as it is generated
    pub stream: bool,
    /// Render every reasoning step
    pub show_full_reasoning: bool,
    /// Relay tool calls and reasoning steps while streaming
    pub stream_intermediate_steps: bool,
}

impl Query {
    /// A non-streamed query with no extra output
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stream: false,
            show_full_reasoning: false,
            stream_intermediate_steps: false,
        }
    }

    /// Set streaming
    pub fn stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    /// Set full reasoning display
    pub fn show_full_reasoning(mut self, show: bool) -> Self {
        self.show_full_reasoning = show;
        self
    }

    /// Set intermediate step streaming
    pub fn stream_intermediate_steps(mut self, on: bool) -> Self {
        self.stream_intermediate_steps = on;
        self
    }
}

/// Binds a model client, toolkits, instructions and a persona
pub struct Dispatcher {
    executor: AgentExecutor,
    toolkits: Vec<ToolDescriptor>,
    show_tool_calls: bool,
}

impl Dispatcher {
    /// Create a builder around a provider
    pub fn builder(provider: Arc<dyn LLMProvider>) -> DispatcherBuilder {
        DispatcherBuilder::new(provider)
    }

    /// Toolkits in the order they are offered
    pub fn toolkits(&self) -> &[ToolDescriptor] {
        &self.toolkits
    }

    /// The composed system prompt
    pub fn system_prompt(&self) -> &str {
        self.executor.config().system_prompt.as_deref().unwrap_or_default()
    }

    /// Model identifier requests are sent to
    pub fn model(&self) -> &str {
        &self.executor.config().model
    }

    /// Run a query, relaying events in emission order
    ///
    /// With `stream` off the stream carries exactly one
    /// [`ResponseEvent::RunCompleted`]. A backend failure ends the stream
    /// with a single error.
    pub fn dispatch(&self, query: &Query) -> ResponseStream {
        info!(
            model = %self.model(),
            stream = query.stream,
            intermediate = query.stream_intermediate_steps,
            "Dispatching query"
        );
        self.executor.run_stream(
            query.message.clone(),
            RunOptions {
                stream: query.stream,
                intermediate_steps: query.stream_intermediate_steps,
            },
        )
    }

    /// Dispatch a query and render it to `out` as it arrives
    ///
    /// Partial output stays on screen when the run fails; the error is
    /// rendered after it and returned.
    pub async fn print_response<W: Write>(&self, query: &Query, out: W) -> Result<RunOutput> {
        let mut renderer = Renderer::new(
            out,
            RenderOptions {
                show_tool_calls: self.show_tool_calls,
                show_full_reasoning: query.show_full_reasoning,
            },
        );
        renderer.query(&query.message).map_err(write_failed)?;

        let mut events = self.dispatch(query);
        let mut final_output = None;
        while let Some(event) = events.next().await {
            match event {
                Ok(event) => {
                    renderer.event(&event).map_err(write_failed)?;
                    if let ResponseEvent::RunCompleted(output) = event {
                        final_output = Some(output);
                    }
                }
                Err(e) => {
                    renderer.error(&e).map_err(write_failed)?;
                    return Err(e);
                }
            }
        }

        final_output.ok_or_else(|| Error::ProcessingFailed("Run ended without a final answer".to_string()))
    }
}

fn write_failed(e: std::io::Error) -> Error {
    Error::ProcessingFailed(format!("Failed to write output: {e}"))
}

/// Builder for [`Dispatcher`]
pub struct DispatcherBuilder {
    provider: Arc<dyn LLMProvider>,
    toolkits: Vec<ToolDescriptor>,
    instructions: InstructionSet,
    persona: String,
    markdown: bool,
    show_tool_calls: bool,
    config: ExecutorConfig,
}

impl DispatcherBuilder {
    /// Create a builder with default executor settings
    pub fn new(provider: Arc<dyn LLMProvider>) -> Self {
        Self {
            provider,
            toolkits: Vec::new(),
            instructions: InstructionSet::default(),
            persona: String::new(),
            markdown: false,
            show_tool_calls: false,
            config: ExecutorConfig::default(),
        }
    }

    /// Set the toolkits, in offer order
    pub fn toolkits(mut self, toolkits: Vec<ToolDescriptor>) -> Self {
        self.toolkits = toolkits;
        self
    }

    /// Set the formatting directives
    pub fn instructions(mut self, instructions: InstructionSet) -> Self {
        self.instructions = instructions;
        self
    }

    /// Set the persona description
    pub fn persona(mut self, persona: impl Into<String>) -> Self {
        self.persona = persona.into();
        self
    }

    /// Ask for markdown output
    pub fn markdown(mut self, markdown: bool) -> Self {
        self.markdown = markdown;
        self
    }

    /// Trace tool calls in rendered output
    pub fn show_tool_calls(mut self, show: bool) -> Self {
        self.show_tool_calls = show;
        self
    }

    /// Set the model
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    /// Set maximum model turns per query
    pub fn max_iterations(mut self, max: usize) -> Self {
        self.config.max_iterations = max;
        self
    }

    /// Set max tokens per completion
    pub fn max_tokens(mut self, max_tokens: usize) -> Self {
        self.config.max_tokens = max_tokens;
        self
    }

    /// Set temperature
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.config.temperature = Some(temperature);
        self
    }

    /// Build the dispatcher; no I/O happens here
    pub fn build(mut self) -> Result<Dispatcher> {
        let registry = ToolRegistry::from_descriptors(&self.toolkits)?;
        self.config.system_prompt = Some(build_system_prompt(
            &self.persona,
            &self.instructions,
            self.markdown,
            &self.toolkits,
        ));
        debug!(
            toolkits = self.toolkits.len(),
            functions = registry.len(),
            "Assembled dispatcher"
        );

        let executor = crate::AgentExecutorBuilder::new()
            .provider(self.provider)
            .tool_registry(Arc::new(registry))
            .config(self.config)
            .build()?;

        Ok(Dispatcher {
            executor,
            toolkits: self.toolkits,
            show_tool_calls: self.show_tool_calls,
        })
    }
}

/// Bind a provider, toolkits, instructions and persona with default settings
pub fn assemble(
    provider: Arc<dyn LLMProvider>,
    toolkits: Vec<ToolDescriptor>,
    instructions: InstructionSet,
    persona: impl Into<String>,
) -> Result<Dispatcher> {
    DispatcherBuilder::new(provider)
        .toolkits(toolkits)
        .instructions(instructions)
        .persona(persona)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_llm::test_support::{ScriptedProvider, ScriptedTurn, text_turn, tool_turn};
    use agent_tools::ReasoningTools;
    use serde_json::json;

    fn dispatcher(provider: Arc<ScriptedProvider>) -> Dispatcher {
        Dispatcher::builder(provider)
            .toolkits(vec![ReasoningTools::new().descriptor()])
            .instructions(InstructionSet::new(["Use only tables to display the data."]))
            .persona("You are an analyst.")
            .markdown(true)
            .show_tool_calls(true)
            .build()
            .unwrap()
    }

    fn scripted() -> Arc<ScriptedProvider> {
        Arc::new(ScriptedProvider::new([
            tool_turn("call_1", "think", json!({"title": "Plan", "thought": "Write it"})),
            text_turn("| Ticker | NVDA |"),
        ]))
    }

    #[tokio::test]
    async fn test_assemble_performs_no_io() {
        let provider = Arc::new(ScriptedProvider::new([]));
        let dispatcher = assemble(
            Arc::clone(&provider) as Arc<dyn LLMProvider>,
            vec![ReasoningTools::new().descriptor()],
            InstructionSet::default(),
            "persona",
        )
        .unwrap();

        let _stream = dispatcher.dispatch(&Query::new("hi"));
        assert!(provider.requests().is_empty());
        assert!(dispatcher.system_prompt().starts_with("persona"));
    }

    #[tokio::test]
    async fn test_non_streamed_dispatch_yields_one_event() {
        let events: Vec<_> = dispatcher(scripted())
            .dispatch(&Query::new("Write a report on NVDA."))
            .collect()
            .await;
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], Ok(ResponseEvent::RunCompleted(o)) if o.content == "| Ticker | NVDA |"));
    }

    #[tokio::test]
    async fn test_stream_and_non_stream_agree() {
        let query = Query::new("Write a report on NVDA.");
        let plain = dispatcher(scripted())
            .print_response(&query, Vec::new())
            .await
            .unwrap();
        let streamed = dispatcher(scripted())
            .print_response(&query.clone().stream(true).stream_intermediate_steps(true), Vec::new())
            .await
            .unwrap();

        assert_eq!(plain.content, streamed.content);
        assert_eq!(plain.tool_calls.len(), streamed.tool_calls.len());
    }

    #[tokio::test]
    async fn test_auth_failure_surfaces_once() {
        let provider = Arc::new(ScriptedProvider::new([ScriptedTurn::AuthFailure]));
        let query = Query::new("Write a report on NVDA.").stream(true);

        let items: Vec<_> = dispatcher(provider).dispatch(&query).collect().await;
        assert_eq!(items.len(), 1);
        assert!(matches!(items[0], Err(Error::Backend(_))));
    }

    #[tokio::test]
    async fn test_print_response_renders_error_after_partial_output() {
        let provider = Arc::new(ScriptedProvider::new([
            tool_turn("call_1", "think", json!({"title": "Plan", "thought": "Go"})),
            ScriptedTurn::Fail("connection reset".to_string()),
        ]));
        let mut out = Vec::new();
        let query = Query::new("Write a report on NVDA.")
            .stream(true)
            .stream_intermediate_steps(true);

        let err = dispatcher(provider)
            .print_response(&query, &mut out)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Backend(_)));

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("• Running: think("));
        assert!(text.contains("connection reset"));
    }
}
