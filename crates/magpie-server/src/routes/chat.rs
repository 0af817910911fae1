use axum::{
    extract::State,
    http::{self, StatusCode},
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use bytes::Bytes;
use futures::{Stream, StreamExt};
use magpie::{
    models::chunk::StreamChunk, models::request::ChatRequest, orchestrator::Orchestrator,
    providers::openai::OpenAiProvider,
};
use serde_json::json;
use std::{
    convert::Infallible,
    pin::Pin,
    task::{Context, Poll},
};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::state::AppState;

/// Response body backed by a channel of pre-framed `data: ...` strings.
pub struct SseResponse {
    rx: ReceiverStream<String>,
}

impl SseResponse {
    fn new(rx: ReceiverStream<String>) -> Self {
        Self { rx }
    }
}

impl Stream for SseResponse {
    type Item = Result<Bytes, Infallible>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.rx)
            .poll_next(cx)
            .map(|opt| opt.map(|s| Ok(Bytes::from(s))))
    }
}

impl IntoResponse for SseResponse {
    fn into_response(self) -> axum::response::Response {
        let body = axum::body::Body::from_stream(self);

        http::Response::builder()
            .header("Content-Type", "text/event-stream")
            .header("Cache-Control", "no-cache")
            .header("Connection", "keep-alive")
            .body(body)
            .unwrap()
    }
}

// Wire framing for the streaming protocol.
struct ProtocolFormatter;

impl ProtocolFormatter {
    /// Re-frame one upstream chunk, wrapping only its incremental content or
    /// tool-call fragment. Chunks carrying neither produce no frame.
    fn format_chunk(chunk: &StreamChunk) -> Option<String> {
        let delta = chunk.delta()?;
        let body = if let Some(content) = delta.content.as_deref().filter(|c| !c.is_empty()) {
            json!({"choices": [{"delta": {"content": content}}]})
        } else if let Some(tool_calls) = &delta.tool_calls {
            json!({"choices": [{"delta": {"tool_calls": tool_calls}}]})
        } else {
            return None;
        };
        Some(format!("data: {body}\n\n"))
    }

    /// A synthetic chunk carrying the error as conversational text, so
    /// clients parsing only `delta.content` still observe the failure.
    fn format_error(message: &str) -> String {
        let body = json!({"choices": [{"delta": {"content": format!("Error: {message}")}}]});
        format!("data: {body}\n\n")
    }

    fn format_done() -> String {
        "data: [DONE]\n\n".to_string()
    }
}

async fn handler(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> axum::response::Response {
    let provider = match OpenAiProvider::new(state.provider_config.clone()) {
        Ok(provider) => provider,
        Err(e) => {
            tracing::error!("failed to build backend client: {e}");
            return error_response(&e.to_string());
        }
    };
    let orchestrator = Orchestrator::new(Box::new(provider), state.knowledge.clone())
        .with_max_tool_rounds(state.max_tool_rounds);

    if request.stream {
        stream_response(orchestrator, request).await.into_response()
    } else {
        match orchestrator.respond(&request).await {
            Ok(body) => Json(body).into_response(),
            Err(e) => {
                tracing::error!("chat completion failed: {e}");
                error_response(&e.to_string())
            }
        }
    }
}

fn error_response(detail: &str) -> axum::response::Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({"detail": detail})),
    )
        .into_response()
}

async fn stream_response(orchestrator: Orchestrator, request: ChatRequest) -> SseResponse {
    let (tx, rx) = mpsc::channel(100);
    let stream = ReceiverStream::new(rx);

    tokio::spawn(async move {
        let mut chunks = match orchestrator.respond_stream(&request).await {
            Ok(chunks) => chunks,
            Err(e) => {
                tracing::error!("failed to open completion stream: {e}");
                let _ = tx.send(ProtocolFormatter::format_error(&e.to_string())).await;
                let _ = tx.send(ProtocolFormatter::format_done()).await;
                return;
            }
        };

        while let Some(chunk) = chunks.next().await {
            match chunk {
                Ok(chunk) => {
                    if let Some(frame) = ProtocolFormatter::format_chunk(&chunk) {
                        // A failed send means the client went away; returning
                        // drops the upstream stream and cancels the backend
                        // call instead of draining it.
                        if tx.send(frame).await.is_err() {
                            return;
                        }
                    }
                }
                Err(e) => {
                    tracing::error!("stream relay failed: {e}");
                    let _ = tx.send(ProtocolFormatter::format_error(&e.to_string())).await;
                    break;
                }
            }
        }

        let _ = tx.send(ProtocolFormatter::format_done()).await;
    });

    SseResponse::new(stream)
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/chat/completions", post(handler))
        .with_state(state)
}
