//! Scripted provider for exercising agent loops without a network
//!
//! [`ScriptedProvider`] replays a queue of turns. Streaming calls split text
//! into word-sized deltas so consumers see the same content arrive in pieces.

use crate::{
    CompletionRequest, CompletionResponse, CompletionStream, ContentBlock, LLMError, LLMProvider,
    Message, Result, StopReason, StreamChunk, TokenUsage,
};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

/// One scripted model turn
#[derive(Debug, Clone)]
pub enum ScriptedTurn {
    /// Answer with this response
    Respond(CompletionResponse),
    /// Reject the call as if the API key were invalid
    AuthFailure,
    /// Fail the call with a transport error
    Fail(String),
}

/// A final text answer
pub fn text_turn(text: impl Into<String>) -> ScriptedTurn {
    ScriptedTurn::Respond(CompletionResponse {
        message: Message::assistant_blocks(vec![ContentBlock::Text { text: text.into() }]),
        stop_reason: StopReason::EndTurn,
        usage: TokenUsage {
            input_tokens: 10,
            output_tokens: 5,
        },
    })
}

/// A turn requesting one tool call
pub fn tool_turn(id: impl Into<String>, name: impl Into<String>, input: Value) -> ScriptedTurn {
    ScriptedTurn::Respond(CompletionResponse {
        message: Message::assistant_blocks(vec![ContentBlock::ToolUse {
            id: id.into(),
            name: name.into(),
            input,
        }]),
        stop_reason: StopReason::ToolUse,
        usage: TokenUsage {
            input_tokens: 10,
            output_tokens: 2,
        },
    })
}

/// Provider that replays a fixed script
#[derive(Debug, Default)]
pub struct ScriptedProvider {
    turns: Mutex<VecDeque<ScriptedTurn>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedProvider {
    /// Create a provider that plays `turns` in order
    pub fn new(turns: impl IntoIterator<Item = ScriptedTurn>) -> Self {
        Self {
            turns: Mutex::new(turns.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Every request received so far
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Turns not yet played
    pub fn remaining(&self) -> usize {
        self.turns.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    fn next_turn(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request);

        let turn = self
            .turns
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();

        match turn {
            Some(ScriptedTurn::Respond(response)) => Ok(response),
            Some(ScriptedTurn::AuthFailure) => Err(LLMError::AuthenticationFailed),
            Some(ScriptedTurn::Fail(reason)) => Err(LLMError::RequestFailed(reason)),
            None => Err(LLMError::UnexpectedResponse(
                "scripted provider ran out of turns".to_string(),
            )),
        }
    }
}

#[async_trait]
impl LLMProvider for ScriptedProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        self.next_turn(request)
    }

    async fn stream(&self, request: CompletionRequest) -> Result<CompletionStream> {
        let response = self.next_turn(request)?;

        let chunks: Vec<Result<StreamChunk>> = response
            .into_chunks()
            .into_iter()
            .flat_map(|chunk| match chunk {
                StreamChunk::TextDelta(text) => text
                    .split_inclusive(' ')
                    .map(|piece| Ok(StreamChunk::TextDelta(piece.to_string())))
                    .collect::<Vec<_>>(),
                other => vec![Ok(other)],
            })
            .collect();

        Ok(Box::pin(futures::stream::iter(chunks)))
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}
