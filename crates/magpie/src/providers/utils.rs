use serde_json::Value;

use crate::errors::ProviderError;
use crate::models::message::Message;

/// Extract `choices[0].message` from a chat-completions response body.
pub fn response_message(response: &Value) -> Result<Message, ProviderError> {
    let message = response
        .pointer("/choices/0/message")
        .ok_or_else(|| ProviderError::InvalidResponse("response has no choices".to_string()))?;
    serde_json::from_value(message.clone())
        .map_err(|e| ProviderError::InvalidResponse(format!("malformed assistant message: {e}")))
}

/// Pull the human-readable message out of an error body, falling back to the
/// raw text.
pub fn api_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| {
            value
                .pointer("/error/message")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.to_string())
}

/// The payload of one SSE line, if it carries a `data:` field. Comment and
/// event lines return `None`.
pub fn sse_data(line: &str) -> Option<&str> {
    line.strip_prefix("data:").map(str::trim_start)
}

/// Accumulates raw network reads and yields complete lines. UTF-8 decoding
/// happens per complete line, so a multibyte character split across two
/// reads is reassembled before conversion instead of being mangled.
#[derive(Default)]
pub struct LineBuffer {
    bytes: Vec<u8>,
}

impl LineBuffer {
    pub fn push(&mut self, piece: &[u8]) {
        self.bytes.extend_from_slice(piece);
    }

    pub fn next_line(&mut self) -> Option<String> {
        let newline = self.bytes.iter().position(|&b| b == b'\n')?;
        let mut line: Vec<u8> = self.bytes.drain(..=newline).collect();
        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        Some(String::from_utf8_lossy(&line).into_owned())
    }
}
