//! Agent executor for running agent loops
//!
//! The AgentExecutor implements the core agent loop pattern:
//! 1. Call LLM with conversation history and available tools
//! 2. If the model requested tools, execute them in order and loop back
//! 3. Otherwise the turn's text is the final answer
//!
//! Every run is exposed as a stream of [`ResponseEvent`]s that always ends
//! with [`ResponseEvent::RunCompleted`] or a single error.

use agent_core::{Error, ReasoningStep, ResponseEvent, Result, RunOutput, ToolCallRecord};
use agent_llm::{
    CompletionRequest, CompletionResponse, ContentBlock, LLMProvider, Message, StopReason,
    StreamChunk, TokenUsage, ToolDefinition,
};
use agent_tools::ToolRegistry;
use async_stream::try_stream;
use futures::{Stream, StreamExt};
use serde_json::Value;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// A run in progress, as a stream of events
pub type ResponseStream = Pin<Box<dyn Stream<Item = Result<ResponseEvent>> + Send>>;

const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant.";

/// Configuration for agent execution
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Maximum number of model turns (prevents infinite loops)
    pub max_iterations: usize,

    /// Model to use
    pub model: String,

    /// System prompt
    pub system_prompt: Option<String>,

    /// Max tokens per completion
    pub max_tokens: usize,

    /// Temperature
    pub temperature: Option<f32>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            model: "gemini-2.5-flash".to_string(),
            system_prompt: None,
            max_tokens: 8192,
            temperature: None,
        }
    }
}

/// How a single run reports progress
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Relay answer text as it is generated
    pub stream: bool,
    /// Also relay tool calls and reasoning steps (only while streaming)
    pub intermediate_steps: bool,
}

/// One model turn, whichever way it arrived
#[derive(Debug, Default)]
struct Turn {
    text: String,
    tool_uses: Vec<(String, String, Value)>,
    stop_reason: Option<StopReason>,
    usage: TokenUsage,
}

impl Turn {
    fn into_message(self) -> (Message, Vec<(String, String, Value)>, String) {
        let mut blocks = Vec::new();
        if !self.text.is_empty() {
            blocks.push(ContentBlock::Text {
                text: self.text.clone(),
            });
        }
        for (id, name, input) in &self.tool_uses {
            blocks.push(ContentBlock::ToolUse {
                id: id.clone(),
                name: name.clone(),
                input: input.clone(),
            });
        }
        (Message::assistant_blocks(blocks), self.tool_uses, self.text)
    }
}

impl From<CompletionResponse> for Turn {
    fn from(response: CompletionResponse) -> Self {
        let mut turn = Turn {
            text: response.message.text().unwrap_or_default(),
            stop_reason: Some(response.stop_reason),
            usage: response.usage,
            ..Turn::default()
        };
        for block in response.message.tool_uses() {
            if let ContentBlock::ToolUse { id, name, input } = block {
                turn.tool_uses.push((id.clone(), name.clone(), input.clone()));
            }
        }
        turn
    }
}

/// Executes an agent loop: LLM → tool calls → execution → loop back
///
/// The AgentExecutor orchestrates the interaction between an LLM provider
/// and a tool registry. It is cheap to clone; clones share the provider and
/// the registry.
#[derive(Clone)]
pub struct AgentExecutor {
    provider: Arc<dyn LLMProvider>,
    tool_registry: Arc<ToolRegistry>,
    config: ExecutorConfig,
}

impl AgentExecutor {
    /// Create a new agent executor
    pub fn new(
        provider: Arc<dyn LLMProvider>,
        tool_registry: Arc<ToolRegistry>,
        config: ExecutorConfig,
    ) -> Self {
        Self {
            provider,
            tool_registry,
            config,
        }
    }

    /// Current configuration
    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Tools offered to the model
    pub fn tool_registry(&self) -> &ToolRegistry {
        &self.tool_registry
    }

    /// Run the loop for one user message and return the final output
    pub async fn run(&self, user_message: impl Into<String>) -> Result<RunOutput> {
        let mut events = self.run_stream(user_message.into(), RunOptions::default());
        while let Some(event) = events.next().await {
            if let ResponseEvent::RunCompleted(output) = event? {
                return Ok(output);
            }
        }
        Err(Error::ProcessingFailed(
            "Run ended without a final answer".to_string(),
        ))
    }

    /// Run the loop for one user message, reporting progress as events
    ///
    /// Nothing happens until the stream is polled. Dropping the stream
    /// abandons any request in flight.
    pub fn run_stream(&self, user_message: String, options: RunOptions) -> ResponseStream {
        Box::pin(self.clone().events(user_message, options))
    }

    fn events(
        self,
        user_message: String,
        options: RunOptions,
    ) -> impl Stream<Item = Result<ResponseEvent>> + Send {
        let executor = self;
        let intermediate = options.stream && options.intermediate_steps;

        try_stream! {
            let started = Instant::now();
            for tool in executor.tool_registry.list_tools() {
                tool.begin_run();
            }

            let definitions = executor.build_tool_definitions();
            let mut conversation = vec![Message::user(user_message)];
            let mut output = RunOutput::default();
            let mut usage = TokenUsage::default();

            loop {
                if output.iterations >= executor.config.max_iterations {
                    warn!(
                        "Max iterations ({}) reached, stopping",
                        executor.config.max_iterations
                    );
                    break;
                }
                output.iterations += 1;

                info!(
                    iteration = output.iterations,
                    max_iterations = executor.config.max_iterations,
                    tool_count = definitions.len(),
                    "Agent iteration started"
                );
                let request = executor.build_request(&conversation, &definitions);

                let turn = if options.stream {
                    let mut chunks = executor.provider.stream(request).await?;
                    let mut turn = Turn::default();
                    while let Some(chunk) = chunks.next().await {
                        match chunk? {
                            StreamChunk::TextDelta(text) => {
                                turn.text.push_str(&text);
                                yield ResponseEvent::ContentDelta { text };
                            }
                            StreamChunk::ToolUse { id, name, input } => {
                                turn.tool_uses.push((id, name, input));
                            }
                            StreamChunk::Done { stop_reason, usage } => {
                                turn.stop_reason = Some(stop_reason);
                                turn.usage = usage;
                            }
                        }
                    }
                    turn
                } else {
                    Turn::from(executor.provider.complete(request).await?)
                };

                info!(
                    stop_reason = ?turn.stop_reason,
                    input_tokens = turn.usage.input_tokens,
                    output_tokens = turn.usage.output_tokens,
                    "LLM response received"
                );
                usage += turn.usage;

                let stop_reason = turn.stop_reason;
                let (message, tool_uses, text) = turn.into_message();
                conversation.push(message);

                if tool_uses.is_empty() {
                    if stop_reason == Some(StopReason::MaxTokens) {
                        warn!("Hit max tokens in LLM response");
                    }
                    info!(
                        iteration = output.iterations,
                        response_length = text.len(),
                        "Agent completed naturally"
                    );
                    output.content = text;
                    break;
                }

                // Text alongside tool calls stands as the answer if the budget runs out
                if !text.is_empty() {
                    output.content = text;
                }

                info!(tool_count = tool_uses.len(), "Agent requested tool use");
                for (id, name, input) in tool_uses {
                    if intermediate {
                        yield ResponseEvent::ToolCallStarted {
                            id: id.clone(),
                            name: name.clone(),
                            arguments: input.clone(),
                        };
                    }

                    let (record, step) = executor.invoke_tool(id, name, input).await;
                    conversation.push(match (&record.result, &record.error) {
                        (_, Some(error)) => {
                            Message::tool_error(&record.id, &record.name, format!("Error: {error}"))
                        }
                        (Some(result), None) => Message::tool_result(&record.id, &record.name, result),
                        (None, None) => Message::tool_result(&record.id, &record.name, ""),
                    });

                    if let Some(step) = step {
                        if intermediate {
                            yield ResponseEvent::ReasoningStep(step.clone());
                        }
                        output.reasoning_steps.push(step);
                    }
                    if intermediate {
                        yield ResponseEvent::ToolCallCompleted(record.clone());
                    }
                    output.tool_calls.push(record);
                }
            }

            output.input_tokens = usage.input_tokens;
            output.output_tokens = usage.output_tokens;
            output.elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
            yield ResponseEvent::RunCompleted(output);
        }
    }

    fn build_request(&self, conversation: &[Message], tools: &[ToolDefinition]) -> CompletionRequest {
        let mut request_builder = CompletionRequest::builder(&self.config.model)
            .messages(conversation.to_vec())
            .system(
                self.config
                    .system_prompt
                    .clone()
                    .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
            )
            .max_tokens(self.config.max_tokens);

        if let Some(temperature) = self.config.temperature {
            request_builder = request_builder.temperature(temperature);
        }
        // Only add tools if we have any
        if !tools.is_empty() {
            request_builder = request_builder.tools(tools.to_vec());
        }
        request_builder.build()
    }

    /// Build tool definitions from the registry
    fn build_tool_definitions(&self) -> Vec<ToolDefinition> {
        self.tool_registry
            .list_tools()
            .iter()
            .map(|tool| ToolDefinition::new(tool.name(), tool.description(), tool.input_schema()))
            .collect()
    }

    /// Execute one requested call; failures become error records, never `Err`
    async fn invoke_tool(
        &self,
        id: String,
        name: String,
        input: Value,
    ) -> (ToolCallRecord, Option<ReasoningStep>) {
        let input_preview: String = input.to_string().chars().take(500).collect();
        info!(
            tool_name = %name,
            tool_id = %id,
            input_preview = %input_preview,
            "Executing tool"
        );

        let mut record = ToolCallRecord {
            id,
            name,
            arguments: input,
            result: None,
            error: None,
            duration_ms: 0,
        };

        let Some(tool) = self.tool_registry.get(&record.name) else {
            warn!(tool_name = %record.name, "Model requested an unknown tool");
            record.error = Some(format!("Tool not found: {}", record.name));
            return (record, None);
        };

        let start_time = Instant::now();
        let outcome = tool.execute(record.arguments.clone()).await;
        record.duration_ms = u64::try_from(start_time.elapsed().as_millis()).unwrap_or(u64::MAX);

        match outcome {
            Ok(result) => {
                let result_str = match result {
                    Value::String(s) => s,
                    other => serde_json::to_string(&other).unwrap_or_else(|_| other.to_string()),
                };
                let result_preview: String = result_str.chars().take(300).collect();
                debug!(
                    tool_name = %record.name,
                    duration_ms = record.duration_ms,
                    result_length = result_str.len(),
                    result_preview = %result_preview,
                    "Tool execution succeeded"
                );
                let step = tool.reasoning_step(&record.arguments);
                record.result = Some(result_str);
                (record, step)
            }
            Err(e) => {
                warn!(
                    tool_name = %record.name,
                    duration_ms = record.duration_ms,
                    error = %e,
                    "Tool execution failed"
                );
                record.error = Some(e.to_string());
                (record, None)
            }
        }
    }
}

/// Builder for AgentExecutor
pub struct AgentExecutorBuilder {
    provider: Option<Arc<dyn LLMProvider>>,
    tool_registry: Arc<ToolRegistry>,
    config: ExecutorConfig,
}

impl AgentExecutorBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self {
            provider: None,
            tool_registry: Arc::new(ToolRegistry::new()),
            config: ExecutorConfig::default(),
        }
    }

    /// Set the LLM provider
    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Set the tool registry
    pub fn tool_registry(mut self, registry: Arc<ToolRegistry>) -> Self {
        self.tool_registry = registry;
        self
    }

    /// Set the full configuration
    pub fn config(mut self, config: ExecutorConfig) -> Self {
        self.config = config;
        self
    }

    /// Set maximum iterations
    pub fn max_iterations(mut self, max: usize) -> Self {
        self.config.max_iterations = max;
        self
    }

    /// Set the model
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    /// Set the system prompt
    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    /// Set max tokens
    pub fn max_tokens(mut self, max_tokens: usize) -> Self {
        self.config.max_tokens = max_tokens;
        self
    }

    /// Set temperature
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.config.temperature = Some(temperature);
        self
    }

    /// Build the executor
    pub fn build(self) -> Result<AgentExecutor> {
        let provider = self
            .provider
            .ok_or_else(|| Error::InitializationFailed("Provider not set".to_string()))?;

        if self.config.max_iterations == 0 {
            return Err(Error::InitializationFailed(
                "max_iterations must be at least 1".to_string(),
            ));
        }

        Ok(AgentExecutor::new(provider, self.tool_registry, self.config))
    }
}

impl Default for AgentExecutorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_core::NextAction;
    use agent_llm::test_support::{ScriptedProvider, ScriptedTurn, text_turn, tool_turn};
    use agent_tools::{ReasoningTools, Tool};
    use async_trait::async_trait;
    use serde_json::json;

    struct FailingTool;

    #[async_trait]
    impl Tool for FailingTool {
        async fn execute(&self, _params: Value) -> Result<Value> {
            Err(Error::ToolUnavailable {
                tool: "get_company_news".to_string(),
                reason: "provider unreachable".to_string(),
            })
        }

        fn name(&self) -> &'static str {
            "get_company_news"
        }

        fn description(&self) -> &'static str {
            "Always fails"
        }

        fn input_schema(&self) -> Value {
            json!({"type": "object", "properties": {}})
        }
    }

    fn executor(provider: Arc<ScriptedProvider>, tools: Vec<Arc<dyn Tool>>) -> AgentExecutor {
        let mut registry = ToolRegistry::new();
        for tool in tools {
            registry.register(tool).unwrap();
        }
        AgentExecutorBuilder::new()
            .provider(provider)
            .tool_registry(Arc::new(registry))
            .model("scripted")
            .build()
            .unwrap()
    }

    #[test]
    fn test_builder() {
        let builder = AgentExecutorBuilder::new()
            .model("test-model")
            .max_iterations(5)
            .system_prompt("Test prompt");

        assert_eq!(builder.config.model, "test-model");
        assert_eq!(builder.config.max_iterations, 5);
        assert_eq!(
            builder.config.system_prompt,
            Some("Test prompt".to_string())
        );
    }

    #[test]
    fn test_builder_requires_provider() {
        assert!(matches!(
            AgentExecutorBuilder::new().build(),
            Err(Error::InitializationFailed(_))
        ));
    }

    #[test]
    fn test_default_config() {
        let config = ExecutorConfig::default();
        assert_eq!(config.max_iterations, 10);
        assert!(config.temperature.is_none());
    }

    #[tokio::test]
    async fn test_tool_failure_is_reported_and_run_continues() {
        let provider = Arc::new(ScriptedProvider::new([
            tool_turn("call_1", "get_company_news", json!({"symbol": "NVDA"})),
            text_turn("No news available."),
        ]));
        let output = executor(Arc::clone(&provider), vec![Arc::new(FailingTool)])
            .run("Latest NVDA news?")
            .await
            .unwrap();

        assert_eq!(output.content, "No news available.");
        assert_eq!(output.iterations, 2);
        assert_eq!(output.tool_calls.len(), 1);
        assert!(output.tool_calls[0].is_error());

        // The second request carries the error back to the model
        let second = &provider.requests()[1];
        match second.messages.last().and_then(|m| m.content.clone()) {
            Some(agent_llm::MessageContent::Blocks(blocks)) => match &blocks[0] {
                ContentBlock::ToolResult {
                    content, is_error, ..
                } => {
                    assert_eq!(*is_error, Some(true));
                    assert!(content.contains("provider unreachable"));
                }
                other => panic!("Expected tool result, got {other:?}"),
            },
            other => panic!("Expected blocks, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unknown_tool_becomes_error_result() {
        let provider = Arc::new(ScriptedProvider::new([
            tool_turn("call_1", "get_weather", json!({})),
            text_turn("done"),
        ]));
        let output = executor(provider, vec![]).run("hi").await.unwrap();
        assert_eq!(
            output.tool_calls[0].error.as_deref(),
            Some("Tool not found: get_weather")
        );
        assert_eq!(output.content, "done");
    }

    #[tokio::test]
    async fn test_intermediate_events_order() {
        let reasoning = ReasoningTools::new();
        let provider = Arc::new(ScriptedProvider::new([
            tool_turn(
                "call_1",
                "think",
                json!({"title": "Plan", "thought": "Gather price"}),
            ),
            text_turn("Final report"),
        ]));
        let tools = reasoning.descriptor().tools().to_vec();
        let events: Vec<ResponseEvent> = executor(provider, tools)
            .run_stream(
                "report".to_string(),
                RunOptions {
                    stream: true,
                    intermediate_steps: true,
                },
            )
            .map(|e| e.unwrap())
            .collect()
            .await;

        assert!(matches!(events[0], ResponseEvent::ToolCallStarted { ref name, .. } if name == "think"));
        assert!(matches!(events[1], ResponseEvent::ReasoningStep(ref s) if s.next_action == NextAction::Continue));
        assert!(matches!(events[2], ResponseEvent::ToolCallCompleted(_)));
        let text: String = events
            .iter()
            .filter_map(|e| match e {
                ResponseEvent::ContentDelta { text } => Some(text.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(text, "Final report");

        match events.last() {
            Some(ResponseEvent::RunCompleted(output)) => {
                assert_eq!(output.content, "Final report");
                assert_eq!(output.reasoning_steps.len(), 1);
                assert_eq!(output.input_tokens, 20);
            }
            other => panic!("Expected RunCompleted, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_max_iterations_stops_the_loop() {
        let turns = (0..5).map(|i| tool_turn(format!("call_{i}"), "get_weather", json!({})));
        let provider = Arc::new(ScriptedProvider::new(turns));
        let exec = AgentExecutorBuilder::new()
            .provider(Arc::clone(&provider) as Arc<dyn LLMProvider>)
            .max_iterations(3)
            .build()
            .unwrap();

        let output = exec.run("loop").await.unwrap();
        assert_eq!(output.iterations, 3);
        assert_eq!(output.tool_calls.len(), 3);
        assert_eq!(provider.remaining(), 2);
    }

    #[tokio::test]
    async fn test_max_iterations_keeps_last_turn_text() {
        let provider = Arc::new(ScriptedProvider::new([ScriptedTurn::Respond(
            CompletionResponse {
                message: Message::assistant_blocks(vec![
                    ContentBlock::Text {
                        text: "NVDA trades at 181.20.".to_string(),
                    },
                    ContentBlock::ToolUse {
                        id: "call_1".to_string(),
                        name: "get_company_news".to_string(),
                        input: json!({"symbol": "NVDA"}),
                    },
                ]),
                stop_reason: StopReason::ToolUse,
                usage: TokenUsage::default(),
            },
        )]));
        let exec = AgentExecutorBuilder::new()
            .provider(provider)
            .tool_registry(Arc::new(ToolRegistry::new()))
            .max_iterations(1)
            .build()
            .unwrap();

        let output = exec.run("price?").await.unwrap();
        assert_eq!(output.iterations, 1);
        assert_eq!(output.content, "NVDA trades at 181.20.");
        assert_eq!(output.tool_calls.len(), 1);
    }

    #[tokio::test]
    async fn test_backend_failure_ends_stream_with_one_error() {
        let provider = Arc::new(ScriptedProvider::new([ScriptedTurn::AuthFailure]));
        let items: Vec<Result<ResponseEvent>> = executor(provider, vec![])
            .run_stream(
                "hi".to_string(),
                RunOptions {
                    stream: true,
                    intermediate_steps: true,
                },
            )
            .collect()
            .await;

        assert_eq!(items.len(), 1);
        assert!(matches!(items[0], Err(Error::Backend(_))));
    }
}
