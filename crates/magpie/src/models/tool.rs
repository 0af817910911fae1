use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::errors::ToolError;

/// Declaration of a tool the proxy can execute locally.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tool {
    /// The name of the tool
    pub name: String,
    /// A description of what the tool does
    pub description: String,
    /// JSON schema for the parameters the tool accepts
    pub parameters: Value,
}

impl Tool {
    pub fn new<N, D>(name: N, description: D, parameters: Value) -> Self
    where
        N: Into<String>,
        D: Into<String>,
    {
        Tool {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }

    /// The OpenAI function-declaration shape sent to the backend.
    pub fn declaration(&self) -> Value {
        json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": self.description,
                "parameters": self.parameters,
            }
        })
    }
}

/// A tool invocation requested by the backend. The id is opaque and
/// backend-assigned; it ties the eventual result back to this request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    pub id: String,
    #[serde(rename = "type", default = "function_call_type")]
    pub kind: String,
    pub function: FunctionCall,
}

fn function_call_type() -> String {
    "function".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FunctionCall {
    pub name: String,
    /// Either a JSON-encoded string blob or an inline object, depending on
    /// the backend.
    pub arguments: Value,
}

impl FunctionCall {
    /// Decode the arguments into a name -> value mapping. Failure is a
    /// recoverable per-call error, not a request-level one.
    pub fn parsed_arguments(&self) -> Result<Map<String, Value>, ToolError> {
        let value = match &self.arguments {
            Value::String(raw) => serde_json::from_str(raw).map_err(|e| {
                ToolError::InvalidParameters(format!("arguments are not valid JSON: {e}"))
            })?,
            other => other.clone(),
        };

        match value {
            Value::Object(map) => Ok(map),
            other => Err(ToolError::InvalidParameters(format!(
                "expected an object of arguments, got: {other}"
            ))),
        }
    }
}
