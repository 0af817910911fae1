use std::time::Duration;

use async_stream::try_stream;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

use super::base::{ChunkStream, Provider};
use super::configs::OpenAiProviderConfig;
use super::utils::{api_error_message, sse_data, LineBuffer};
use crate::errors::ProviderError;
use crate::models::chunk::StreamChunk;
use crate::models::message::Message;

pub struct OpenAiProvider {
    client: Client,
    config: OpenAiProviderConfig,
}

impl OpenAiProvider {
    pub fn new(config: OpenAiProviderConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { client, config })
    }

    fn payload(
        &self,
        model: &str,
        messages: &[Message],
        tools: &[Value],
        temperature: f32,
        max_tokens: Option<u32>,
        stream: bool,
    ) -> Value {
        let mut payload = json!({
            "model": model,
            "messages": messages,
            "temperature": temperature,
        });

        let body = payload.as_object_mut().unwrap();
        if !tools.is_empty() {
            body.insert("tools".to_string(), json!(tools));
        }
        if let Some(tokens) = max_tokens {
            body.insert("max_tokens".to_string(), json!(tokens));
        }
        if stream {
            body.insert("stream".to_string(), json!(true));
        }

        payload
    }

    async fn post(&self, payload: &Value) -> Result<reqwest::Response, ProviderError> {
        let url = format!(
            "{}/v1/chat/completions",
            self.config.host.trim_end_matches('/')
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message: api_error_message(&body),
            });
        }

        Ok(response)
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    async fn complete(
        &self,
        model: &str,
        messages: &[Message],
        tools: &[Value],
        temperature: f32,
        max_tokens: Option<u32>,
    ) -> Result<Value, ProviderError> {
        let payload = self.payload(model, messages, tools, temperature, max_tokens, false);
        let response = self.post(&payload).await?;
        let body: Value = response.json().await?;

        // Some gateways report API errors inside a 200 body.
        if let Some(error) = body.get("error") {
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| error.to_string());
            return Err(ProviderError::Api {
                status: 200,
                message,
            });
        }

        Ok(body)
    }

    async fn complete_stream(
        &self,
        model: &str,
        messages: &[Message],
        tools: &[Value],
        temperature: f32,
        max_tokens: Option<u32>,
    ) -> Result<ChunkStream, ProviderError> {
        let payload = self.payload(model, messages, tools, temperature, max_tokens, true);
        let response = self.post(&payload).await?;

        let stream = try_stream! {
            let mut bytes = response.bytes_stream();
            let mut buffer = LineBuffer::default();

            'relay: while let Some(piece) = bytes.next().await {
                let piece = piece?;
                buffer.push(&piece);

                while let Some(line) = buffer.next_line() {
                    let data = match sse_data(&line) {
                        Some(data) => data.to_string(),
                        None => continue,
                    };
                    if data == "[DONE]" {
                        break 'relay;
                    }

                    let chunk: StreamChunk = serde_json::from_str(&data).map_err(|e| {
                        ProviderError::InvalidResponse(format!("bad stream frame: {e}"))
                    })?;
                    yield chunk;
                }
            }
        };

        Ok(Box::pin(stream))
    }
}
