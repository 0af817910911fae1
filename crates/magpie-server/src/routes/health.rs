use axum::{extract::State, response::Json, routing::get, Router};
use chrono::Utc;
use serde_json::{json, Value};

use magpie::tools::ToolRegistry;

use crate::state::AppState;

async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

/// Service descriptor for the root endpoint.
async fn root(State(state): State<AppState>) -> Json<Value> {
    let tools: Vec<String> = ToolRegistry::new(state.knowledge.clone())
        .declarations()
        .into_iter()
        .map(|tool| tool.name)
        .collect();

    Json(json!({
        "name": "Magpie LLM Proxy",
        "version": env!("CARGO_PKG_VERSION"),
        "features": ["RAG", "Tool Calling", "OpenAI Compatible"],
        "endpoints": {
            "chat": "/chat/completions",
            "health": "/health",
        },
        "tools": tools,
    }))
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/", get(root))
        .with_state(state)
}
