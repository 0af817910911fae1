use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failures inside a single tool dispatch. These are always folded back into
/// the conversation as a tool-role message, never surfaced to the transport.
#[non_exhaustive]
#[derive(Error, Debug, Clone, Deserialize, Serialize)]
pub enum ToolError {
    #[error("Unknown function: {0}")]
    NotFound(String),

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Execution failed: {0}")]
    ExecutionError(String),
}

pub type ToolResult<T> = Result<T, ToolError>;

/// Failures talking to the model backend. Unlike tool errors these terminate
/// the orchestration loop.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("request to model backend failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("model backend returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("unexpected backend response: {0}")]
    InvalidResponse(String),
}

#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error(transparent)]
    Backend(#[from] ProviderError),

    #[error("tool loop exceeded {0} rounds without a final response")]
    ToolLoopExceeded(usize),

    #[error("internal error: {0}")]
    Internal(String),
}
