//! Google Gemini provider implementation
//!
//! Talks to the Generative Language REST API:
//! `POST {api_base}/models/{model}:generateContent` for single responses and
//! `:streamGenerateContent?alt=sse` for incremental output.
//!
//! # Example
//!
//! ```no_run
//! use agent_llm::{CompletionRequest, LLMProvider, Message};
//! use agent_llm::providers::{GeminiConfig, GeminiProvider};
//! use agent_utils::Credential;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let key = Credential::new("GEMINI_API_KEY", "your-key")?;
//!     let provider = GeminiProvider::with_config(GeminiConfig::new(key))?;
//!
//!     let request = CompletionRequest::builder("gemini-2.5-flash")
//!         .add_message(Message::user("Hello!"))
//!         .max_tokens(256)
//!         .build();
//!
//!     let response = provider.complete(request).await?;
//!     println!("{}", response.message.text().unwrap_or_default());
//!     Ok(())
//! }
//! ```

use crate::{
    CompletionRequest, CompletionResponse, CompletionStream, ContentBlock, LLMError, LLMProvider,
    Message, MessageContent, Result, Role, StopReason, StreamChunk, TokenUsage, ToolDefinition,
};
use agent_utils::{ConfigError, Credential, Settings};
use async_stream::try_stream;
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::time::Duration;
use tracing::{debug, instrument, trace, warn};

/// Environment variable holding the Gemini API key
pub const GEMINI_API_KEY_VAR: &str = "GEMINI_API_KEY";

const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Schema keywords the function-declaration format understands
const SCHEMA_KEYS: &[&str] = &[
    "type",
    "format",
    "description",
    "nullable",
    "enum",
    "properties",
    "required",
    "items",
];

/// Configuration for the Gemini provider
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// API key sent in the `x-goog-api-key` header
    pub api_key: Credential,

    /// Base URL, without trailing slash
    pub api_base: String,

    /// Request timeout in seconds (default: 120)
    pub timeout_secs: u64,
}

impl GeminiConfig {
    /// Create a config with default endpoint and timeout
    pub fn new(api_key: Credential) -> Self {
        Self {
            api_key,
            api_base: DEFAULT_GEMINI_API_BASE.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Create a config from hydrated settings
    ///
    /// Requires `GEMINI_API_KEY`; honours `GEMINI_API_BASE` and the request
    /// timeout override when present.
    pub fn from_settings(settings: &Settings) -> std::result::Result<Self, ConfigError> {
        let mut config = Self::new(settings.credential(GEMINI_API_KEY_VAR)?);
        if let Some(base) = settings.gemini_api_base() {
            config.api_base = base.to_string();
        }
        config.timeout_secs = settings.request_timeout().as_secs();
        Ok(config)
    }

    /// Set custom API base URL
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// Set request timeout in seconds
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }
}

/// Gemini provider
pub struct GeminiProvider {
    client: Client,
    config: GeminiConfig,
}

impl GeminiProvider {
    /// Create a provider with custom configuration
    pub fn with_config(config: GeminiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { client, config })
    }

    /// Get the current configuration
    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    fn endpoint(&self, model: &str, streaming: bool) -> String {
        if streaming {
            format!(
                "{}/models/{model}:streamGenerateContent?alt=sse",
                self.config.api_base
            )
        } else {
            format!("{}/models/{model}:generateContent", self.config.api_base)
        }
    }

    /// POST the body and turn non-success statuses into typed errors
    async fn post(&self, url: String, body: &GeminiRequest, model: &str) -> Result<reqwest::Response> {
        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", self.config.api_key.expose())
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let error_text = response.text().await?;
            return Err(map_status(status, error_text, model));
        }
        Ok(response)
    }
}

#[async_trait]
impl LLMProvider for GeminiProvider {
    #[instrument(skip(self, request), fields(model = %request.model))]
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        debug!("Sending request to Gemini API at {}", self.config.api_base);

        let model = request.model.clone();
        let body = build_gemini_request(request);
        let response = self.post(self.endpoint(&model, false), &body, &model).await?;

        let gemini_response: GeminiResponse = response.json().await.map_err(|e| {
            LLMError::UnexpectedResponse(format!("Failed to parse response: {e}"))
        })?;

        parse_gemini_response(gemini_response)
    }

    #[instrument(skip(self, request), fields(model = %request.model))]
    async fn stream(&self, request: CompletionRequest) -> Result<CompletionStream> {
        debug!("Opening Gemini stream at {}", self.config.api_base);

        let model = request.model.clone();
        let body = build_gemini_request(request);
        let response = self.post(self.endpoint(&model, true), &body, &model).await?;

        Ok(Box::pin(decode_stream(response)))
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}

/// Turn an SSE body into completion chunks
fn decode_stream(response: reqwest::Response) -> impl Stream<Item = Result<StreamChunk>> + Send {
    try_stream! {
        let mut body = response.bytes_stream();
        let mut decoder = crate::sse::SseDecoder::new();
        let mut state = StreamState::default();

        while let Some(bytes) = body.next().await {
            let bytes = bytes?;
            for payload in decoder.push(&bytes) {
                for chunk in state.accept(&payload)? {
                    yield chunk;
                }
            }
        }
        if let Some(payload) = decoder.finish() {
            for chunk in state.accept(&payload)? {
                yield chunk;
            }
        }
        yield state.finish();
    }
}

// ============================================================================
// Gemini-specific request types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<GeminiTool>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    thought: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    function_call: Option<FunctionCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    function_response: Option<FunctionResponse>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FunctionCall {
    #[serde(default, skip_serializing)]
    id: Option<String>,
    name: String,
    #[serde(default)]
    args: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FunctionResponse {
    name: String,
    response: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiTool {
    function_declarations: Vec<FunctionDeclaration>,
}

#[derive(Debug, Serialize)]
struct FunctionDeclaration {
    name: String,
    description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    parameters: Option<Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop_sequences: Option<Vec<String>>,
}

// ============================================================================
// Gemini-specific response types
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<GeminiContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: usize,
    #[serde(default)]
    candidates_token_count: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

impl From<UsageMetadata> for TokenUsage {
    fn from(usage: UsageMetadata) -> Self {
        TokenUsage {
            input_tokens: usage.prompt_token_count,
            output_tokens: usage.candidates_token_count,
        }
    }
}

// ============================================================================
// Conversion functions
// ============================================================================

fn build_gemini_request(request: CompletionRequest) -> GeminiRequest {
    let mut system_parts: Vec<String> = request.system.into_iter().collect();
    let mut contents: Vec<GeminiContent> = Vec::new();

    for message in request.messages {
        if message.role == Role::System {
            if let Some(text) = message.text() {
                system_parts.push(text);
            }
            continue;
        }
        let role = if message.role == Role::Assistant { "model" } else { "user" };
        let parts = convert_parts(message);
        if parts.is_empty() {
            continue;
        }
        // Consecutive turns from the same side are merged into one content
        match contents.last_mut() {
            Some(last) if last.role.as_deref() == Some(role) => last.parts.extend(parts),
            _ => contents.push(GeminiContent {
                role: Some(role.to_string()),
                parts,
            }),
        }
    }

    let system_instruction = if system_parts.is_empty() {
        None
    } else {
        Some(GeminiContent {
            role: None,
            parts: vec![GeminiPart {
                text: Some(system_parts.join("\n\n")),
                ..GeminiPart::default()
            }],
        })
    };

    let tools = request
        .tools
        .filter(|tools| !tools.is_empty())
        .map(|tools| {
            vec![GeminiTool {
                function_declarations: tools.iter().map(convert_tool).collect(),
            }]
        });

    GeminiRequest {
        contents,
        system_instruction,
        tools,
        generation_config: GenerationConfig {
            max_output_tokens: request.max_tokens,
            temperature: request.temperature,
            stop_sequences: request.stop_sequences,
        },
    }
}

fn convert_parts(message: Message) -> Vec<GeminiPart> {
    match message.content {
        None => Vec::new(),
        Some(MessageContent::Text(text)) => vec![GeminiPart {
            text: Some(text),
            ..GeminiPart::default()
        }],
        Some(MessageContent::Blocks(blocks)) => blocks
            .into_iter()
            .map(|block| match block {
                ContentBlock::Text { text } => GeminiPart {
                    text: Some(text),
                    ..GeminiPart::default()
                },
                ContentBlock::ToolUse { id, name, input } => GeminiPart {
                    function_call: Some(FunctionCall {
                        id: Some(id),
                        name,
                        args: input,
                    }),
                    ..GeminiPart::default()
                },
                ContentBlock::ToolResult {
                    name,
                    content,
                    is_error,
                    ..
                } => GeminiPart {
                    function_response: Some(FunctionResponse {
                        name,
                        response: wrap_tool_output(&content, is_error.unwrap_or(false)),
                    }),
                    ..GeminiPart::default()
                },
            })
            .collect(),
    }
}

/// Function responses must be JSON objects
fn wrap_tool_output(content: &str, is_error: bool) -> Value {
    if is_error {
        return json!({ "error": content });
    }
    match serde_json::from_str::<Value>(content) {
        Ok(Value::Object(map)) => Value::Object(map),
        Ok(other) => json!({ "result": other }),
        Err(_) => json!({ "result": content }),
    }
}

fn convert_tool(tool: &ToolDefinition) -> FunctionDeclaration {
    let parameters = sanitize_schema(&tool.input_schema);
    let has_properties = parameters
        .get("properties")
        .and_then(Value::as_object)
        .is_some_and(|p| !p.is_empty());

    FunctionDeclaration {
        name: tool.name.clone(),
        description: tool.description.clone(),
        parameters: has_properties.then_some(parameters),
    }
}

/// Reduce a JSON Schema to the keywords function declarations accept
fn sanitize_schema(schema: &Value) -> Value {
    let Value::Object(source) = schema else {
        return schema.clone();
    };

    let mut out = Map::new();
    for (key, value) in source {
        if !SCHEMA_KEYS.contains(&key.as_str()) {
            continue;
        }
        match key.as_str() {
            "type" => match value {
                Value::String(t) => {
                    out.insert(key.clone(), Value::String(t.to_ascii_uppercase()));
                }
                // ["string", "null"] style unions
                Value::Array(types) => {
                    let concrete = types
                        .iter()
                        .filter_map(Value::as_str)
                        .find(|t| *t != "null");
                    if let Some(t) = concrete {
                        out.insert(key.clone(), Value::String(t.to_ascii_uppercase()));
                    }
                    if types.iter().any(|t| t == "null") {
                        out.insert("nullable".to_string(), Value::Bool(true));
                    }
                }
                _ => {}
            },
            "properties" => {
                if let Value::Object(props) = value {
                    let props = props
                        .iter()
                        .map(|(name, prop)| (name.clone(), sanitize_schema(prop)))
                        .collect();
                    out.insert(key.clone(), Value::Object(props));
                }
            }
            "items" => {
                out.insert(key.clone(), sanitize_schema(value));
            }
            _ => {
                out.insert(key.clone(), value.clone());
            }
        }
    }
    Value::Object(out)
}

fn parse_gemini_response(response: GeminiResponse) -> Result<CompletionResponse> {
    let usage = response.usage_metadata.map(TokenUsage::from).unwrap_or_default();

    let Some(candidate) = response.candidates.into_iter().next() else {
        let reason = response
            .prompt_feedback
            .and_then(|f| f.block_reason)
            .unwrap_or_else(|| "no candidates returned".to_string());
        return Err(LLMError::UnexpectedResponse(format!(
            "Gemini returned no answer: {reason}"
        )));
    };

    let blocks: Vec<ContentBlock> = candidate
        .content
        .map(|c| c.parts)
        .unwrap_or_default()
        .into_iter()
        .filter_map(part_to_block)
        .collect();

    let has_tool_use = blocks
        .iter()
        .any(|b| matches!(b, ContentBlock::ToolUse { .. }));
    let stop_reason = map_finish_reason(candidate.finish_reason.as_deref(), has_tool_use);

    debug!(
        "Received response - stop_reason: {:?}, tokens: {}/{}",
        stop_reason, usage.input_tokens, usage.output_tokens
    );

    Ok(CompletionResponse {
        message: Message::assistant_blocks(blocks),
        stop_reason,
        usage,
    })
}

fn part_to_block(part: GeminiPart) -> Option<ContentBlock> {
    if part.thought == Some(true) {
        return None;
    }
    if let Some(call) = part.function_call {
        return Some(ContentBlock::ToolUse {
            id: call.id.unwrap_or_else(new_call_id),
            name: call.name,
            input: if call.args.is_null() { json!({}) } else { call.args },
        });
    }
    part.text
        .filter(|t| !t.is_empty())
        .map(|text| ContentBlock::Text { text })
}

fn new_call_id() -> String {
    format!("call_{}", uuid::Uuid::new_v4().simple())
}

fn map_finish_reason(reason: Option<&str>, has_tool_use: bool) -> StopReason {
    if has_tool_use {
        return StopReason::ToolUse;
    }
    match reason {
        Some("MAX_TOKENS") => StopReason::MaxTokens,
        Some("STOP") | None => StopReason::EndTurn,
        Some(other) => {
            warn!(finish_reason = other, "Gemini stopped early");
            StopReason::EndTurn
        }
    }
}

fn map_status(status: u16, body: String, model: &str) -> LLMError {
    match status {
        401 | 403 => LLMError::AuthenticationFailed,
        400 if body.contains("API_KEY_INVALID") || body.contains("API key not valid") => {
            LLMError::AuthenticationFailed
        }
        400 => LLMError::InvalidRequest(body),
        404 => LLMError::ModelNotFound(model.to_string()),
        429 => LLMError::RateLimitExceeded(body),
        _ => LLMError::RequestFailed(format!("HTTP {status}: {body}")),
    }
}

/// Accumulates stream-wide facts while SSE payloads arrive
#[derive(Debug, Default)]
struct StreamState {
    usage: TokenUsage,
    finish_reason: Option<String>,
    saw_tool_use: bool,
    events: usize,
}

impl StreamState {
    fn accept(&mut self, payload: &str) -> Result<Vec<StreamChunk>> {
        self.events += 1;
        trace!(event = self.events, "Gemini stream payload: {payload}");

        let response: GeminiResponse = serde_json::from_str(payload)
            .map_err(|e| LLMError::StreamError(format!("Malformed stream event: {e}")))?;

        // Usage counts are cumulative; the latest report wins
        if let Some(usage) = response.usage_metadata {
            self.usage = usage.into();
        }

        let mut chunks = Vec::new();
        for candidate in response.candidates.into_iter().take(1) {
            if let Some(reason) = candidate.finish_reason {
                self.finish_reason = Some(reason);
            }
            let parts = candidate.content.map(|c| c.parts).unwrap_or_default();
            for block in parts.into_iter().filter_map(part_to_block) {
                match block {
                    ContentBlock::Text { text } => chunks.push(StreamChunk::TextDelta(text)),
                    ContentBlock::ToolUse { id, name, input } => {
                        self.saw_tool_use = true;
                        chunks.push(StreamChunk::ToolUse { id, name, input });
                    }
                    ContentBlock::ToolResult { .. } => {}
                }
            }
        }
        Ok(chunks)
    }

    fn finish(self) -> StreamChunk {
        debug!(events = self.events, "Gemini stream closed");
        StreamChunk::Done {
            stop_reason: map_finish_reason(self.finish_reason.as_deref(), self.saw_tool_use),
            usage: self.usage,
        }
    }
}
