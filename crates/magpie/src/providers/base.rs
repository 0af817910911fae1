use async_trait::async_trait;
use futures::stream::BoxStream;
use serde_json::Value;

use crate::errors::ProviderError;
use crate::models::chunk::StreamChunk;
use crate::models::message::Message;

/// A finite, non-restartable sequence of completion chunks in backend order.
pub type ChunkStream = BoxStream<'static, Result<StreamChunk, ProviderError>>;

/// The model backend. Tools are forwarded unmodified; failures are always a
/// distinguishable error outcome, never a partial success.
#[async_trait]
pub trait Provider: Send + Sync {
    /// One whole completion. Returns the raw OpenAI-shaped response body.
    async fn complete(
        &self,
        model: &str,
        messages: &[Message],
        tools: &[Value],
        temperature: f32,
        max_tokens: Option<u32>,
    ) -> Result<Value, ProviderError>;

    /// Streaming completion. The relay preserves chunk order as received.
    async fn complete_stream(
        &self,
        model: &str,
        messages: &[Message],
        tools: &[Value],
        temperature: f32,
        max_tokens: Option<u32>,
    ) -> Result<ChunkStream, ProviderError>;
}
