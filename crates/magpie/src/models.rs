//! Wire-shaped types for the OpenAI chat-completions dialect.
//!
//! These are deliberately close to the JSON that crosses the wire in both
//! directions: the inbound request body, the messages we resend to the
//! backend on every tool round, and the delta chunks of a streamed response.

pub mod chunk;
pub mod message;
pub mod request;
pub mod tool;
