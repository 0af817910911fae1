//! Context enrichment: synthesizes the system message that carries the
//! knowledge base into the conversation.

use serde::Serialize;
use tera::Error as TeraError;

use crate::knowledge::KnowledgeBase;
use crate::models::message::Message;
use crate::prompt_template::load_prompt;

const SYSTEM_TEMPLATE: &str = r#"
You are a helpful AI assistant with access to a company knowledge base and external tools.

Company Information:
{{ company_info }}

FAQ Information:
{{ faq }}

When users ask questions, first check if the information is available in the knowledge base.
Use tools when you need real-time information or to perform calculations.
Be helpful, accurate, and reference your knowledge base when appropriate.
"#;

#[derive(Serialize)]
struct SystemContext {
    company_info: String,
    faq: String,
}

/// Prepend the synthesized system message to `messages`, leaving the
/// originals unchanged and in order. Callers apply this exactly once per
/// inbound request; re-running it on an already enriched sequence would
/// duplicate the system message.
pub fn enrich(knowledge: &KnowledgeBase, messages: &[Message]) -> Result<Vec<Message>, TeraError> {
    let context = SystemContext {
        company_info: serde_json::to_string_pretty(&knowledge.company)
            .map_err(|e| TeraError::msg(e.to_string()))?,
        faq: serde_json::to_string_pretty(&knowledge.faq)
            .map_err(|e| TeraError::msg(e.to_string()))?,
    };
    let system = load_prompt(SYSTEM_TEMPLATE, &context)?;

    let mut enriched = Vec::with_capacity(messages.len() + 1);
    enriched.push(Message::system(system));
    enriched.extend_from_slice(messages);
    Ok(enriched)
}
