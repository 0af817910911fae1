use std::sync::Mutex;

use async_trait::async_trait;
use futures::stream;
use serde_json::Value;

use super::base::{ChunkStream, Provider};
use crate::errors::ProviderError;
use crate::models::chunk::StreamChunk;
use crate::models::message::Message;

/// A mock provider that replays pre-configured response bodies in order and
/// records the message history of every call, so tests can assert exactly
/// what each backend round received.
pub struct MockProvider {
    responses: Mutex<Vec<Value>>,
    chunks: Mutex<Vec<Result<StreamChunk, ProviderError>>>,
    histories: Mutex<Vec<Vec<Message>>>,
}

impl MockProvider {
    pub fn new(responses: Vec<Value>) -> Self {
        Self {
            responses: Mutex::new(responses),
            chunks: Mutex::new(Vec::new()),
            histories: Mutex::new(Vec::new()),
        }
    }

    pub fn streaming(chunks: Vec<Result<StreamChunk, ProviderError>>) -> Self {
        Self {
            responses: Mutex::new(Vec::new()),
            chunks: Mutex::new(chunks),
            histories: Mutex::new(Vec::new()),
        }
    }

    /// The message sequences passed to each backend call, in call order.
    pub fn call_histories(&self) -> Vec<Vec<Message>> {
        self.histories.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn complete(
        &self,
        _model: &str,
        messages: &[Message],
        _tools: &[Value],
        _temperature: f32,
        _max_tokens: Option<u32>,
    ) -> Result<Value, ProviderError> {
        self.histories.lock().unwrap().push(messages.to_vec());

        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            Err(ProviderError::InvalidResponse(
                "mock provider has no responses left".to_string(),
            ))
        } else {
            Ok(responses.remove(0))
        }
    }

    async fn complete_stream(
        &self,
        _model: &str,
        messages: &[Message],
        _tools: &[Value],
        _temperature: f32,
        _max_tokens: Option<u32>,
    ) -> Result<ChunkStream, ProviderError> {
        self.histories.lock().unwrap().push(messages.to_vec());

        let chunks: Vec<_> = self.chunks.lock().unwrap().drain(..).collect();
        Ok(Box::pin(stream::iter(chunks)))
    }
}
