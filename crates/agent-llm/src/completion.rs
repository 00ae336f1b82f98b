//! Completion request and response types

use crate::{ContentBlock, LLMError, Message, ToolDefinition};
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;

/// Request for LLM completion with full conversation history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// Model identifier (provider-specific)
    pub model: String,

    /// Conversation history (alternating user/assistant messages)
    pub messages: Vec<Message>,

    /// Optional system prompt
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    /// Maximum tokens to generate
    pub max_tokens: usize,

    /// Sampling temperature (0.0-2.0)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Tools available for the LLM to call
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolDefinition>>,

    /// Stop sequences
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_sequences: Option<Vec<String>>,
}

/// Response from LLM completion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    /// Generated message from the assistant
    pub message: Message,

    /// Stop reason (completed, max_tokens, tool_use, etc.)
    pub stop_reason: StopReason,

    /// Token usage statistics
    pub usage: TokenUsage,
}

impl CompletionResponse {
    /// Split the response into the chunks a streaming call would have produced
    pub fn into_chunks(self) -> Vec<StreamChunk> {
        let mut chunks = Vec::new();
        if let Some(crate::MessageContent::Blocks(blocks)) = self.message.content {
            for block in blocks {
                match block {
                    ContentBlock::Text { text } if !text.is_empty() => {
                        chunks.push(StreamChunk::TextDelta(text));
                    }
                    ContentBlock::ToolUse { id, name, input } => {
                        chunks.push(StreamChunk::ToolUse { id, name, input });
                    }
                    _ => {}
                }
            }
        } else if let Some(crate::MessageContent::Text(text)) = self.message.content {
            if !text.is_empty() {
                chunks.push(StreamChunk::TextDelta(text));
            }
        }
        chunks.push(StreamChunk::Done {
            stop_reason: self.stop_reason,
            usage: self.usage,
        });
        chunks
    }
}

/// Reason the LLM stopped generating
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Natural completion (end of turn)
    EndTurn,

    /// Hit max tokens limit
    MaxTokens,

    /// Stop sequence encountered
    StopSequence,

    /// Tool use requested
    ToolUse,
}

/// Token usage statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Number of input tokens
    pub input_tokens: usize,

    /// Number of output tokens
    pub output_tokens: usize,
}

impl TokenUsage {
    /// Total tokens used (input + output)
    pub fn total(&self) -> usize {
        self.input_tokens + self.output_tokens
    }
}

impl std::ops::AddAssign for TokenUsage {
    fn add_assign(&mut self, rhs: Self) {
        self.input_tokens += rhs.input_tokens;
        self.output_tokens += rhs.output_tokens;
    }
}

/// One increment of a streamed completion
#[derive(Debug, Clone, PartialEq)]
pub enum StreamChunk {
    /// A fragment of assistant text
    TextDelta(String),
    /// A complete tool call
    ToolUse {
        /// Call identifier
        id: String,
        /// Tool name
        name: String,
        /// Arguments
        input: serde_json::Value,
    },
    /// End of the turn; always the last chunk
    Done {
        /// Why generation stopped
        stop_reason: StopReason,
        /// Token usage for the turn
        usage: TokenUsage,
    },
}

/// A stream of completion chunks
pub type CompletionStream =
    Pin<Box<dyn Stream<Item = std::result::Result<StreamChunk, LLMError>> + Send>>;

impl CompletionRequest {
    /// Create a builder for completion requests
    pub fn builder(model: impl Into<String>) -> CompletionRequestBuilder {
        CompletionRequestBuilder::new(model)
    }
}

/// Builder for CompletionRequest
pub struct CompletionRequestBuilder {
    model: String,
    messages: Vec<Message>,
    system: Option<String>,
    max_tokens: usize,
    temperature: Option<f32>,
    tools: Option<Vec<ToolDefinition>>,
    stop_sequences: Option<Vec<String>>,
}

impl CompletionRequestBuilder {
    /// Create a new builder
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            messages: Vec::new(),
            system: None,
            max_tokens: 1024,
            temperature: None,
            tools: None,
            stop_sequences: None,
        }
    }

    /// Set the conversation messages
    pub fn messages(mut self, messages: Vec<Message>) -> Self {
        self.messages = messages;
        self
    }

    /// Add a single message
    pub fn add_message(mut self, message: Message) -> Self {
        self.messages.push(message);
        self
    }

    /// Set the system prompt
    pub fn system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Set the maximum tokens
    pub fn max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Set the temperature
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the available tools
    pub fn tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = Some(tools);
        self
    }

    /// Set stop sequences
    pub fn stop_sequences(mut self, sequences: Vec<String>) -> Self {
        self.stop_sequences = Some(sequences);
        self
    }

    /// Build the completion request
    pub fn build(self) -> CompletionRequest {
        CompletionRequest {
            model: self.model,
            messages: self.messages,
            system: self.system,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            tools: self.tools,
            stop_sequences: self.stop_sequences,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builder() {
        let request = CompletionRequest::builder("gemini-2.5-flash")
            .add_message(Message::user("Hello"))
            .system("You are a helpful assistant")
            .max_tokens(2048)
            .temperature(0.7)
            .build();

        assert_eq!(request.model, "gemini-2.5-flash");
        assert_eq!(request.messages.len(), 1);
        assert_eq!(request.max_tokens, 2048);
        assert_eq!(request.temperature, Some(0.7));
        assert!(request.tools.is_none());
    }

    #[test]
    fn test_token_usage() {
        let mut usage = TokenUsage {
            input_tokens: 100,
            output_tokens: 50,
        };
        assert_eq!(usage.total(), 150);

        usage += TokenUsage {
            input_tokens: 10,
            output_tokens: 5,
        };
        assert_eq!(usage.total(), 165);
    }

    #[test]
    fn test_into_chunks_preserves_block_order() {
        let response = CompletionResponse {
            message: Message::assistant_blocks(vec![
                ContentBlock::Text {
                    text: "Checking price".to_string(),
                },
                ContentBlock::ToolUse {
                    id: "call_1".to_string(),
                    name: "get_current_stock_price".to_string(),
                    input: json!({"symbol": "NVDA"}),
                },
            ]),
            stop_reason: StopReason::ToolUse,
            usage: TokenUsage::default(),
        };

        let chunks = response.into_chunks();
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0], StreamChunk::TextDelta("Checking price".to_string()));
        assert!(matches!(chunks[1], StreamChunk::ToolUse { ref name, .. } if name == "get_current_stock_price"));
        assert!(matches!(
            chunks[2],
            StreamChunk::Done {
                stop_reason: StopReason::ToolUse,
                ..
            }
        ));
    }
}
