//! LLM provider trait definition

use crate::{CompletionRequest, CompletionResponse, CompletionStream, Result};
use async_trait::async_trait;

/// Trait for LLM providers
///
/// Implementations of this trait provide access to different LLM services.
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Generate a completion from the LLM
    ///
    /// # Arguments
    ///
    /// * `request` - The completion request with messages, tools, and parameters
    ///
    /// # Returns
    ///
    /// The completion response with the assistant's message and metadata
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse>;

    /// Generate a completion as a stream of chunks
    ///
    /// Connection and authentication failures are returned before the stream
    /// is handed out; failures after that arrive as stream items. The stream
    /// always ends with [`crate::StreamChunk::Done`] on success.
    ///
    /// The default implementation waits for [`LLMProvider::complete`] and
    /// replays the response as chunks.
    async fn stream(&self, request: CompletionRequest) -> Result<CompletionStream> {
        let response = self.complete(request).await?;
        let chunks = response.into_chunks().into_iter().map(Ok);
        Ok(Box::pin(futures::stream::iter(chunks)))
    }

    /// Get the provider name (e.g., "gemini")
    fn name(&self) -> &str;
}
