use std::sync::Arc;

use magpie::knowledge::KnowledgeBase;
use magpie::providers::configs::OpenAiProviderConfig;

use crate::configuration::Settings;

/// Shared application state. The knowledge base is immutable after startup
/// and shared by reference; everything else is cheap to clone per request.
#[derive(Clone)]
pub struct AppState {
    pub provider_config: OpenAiProviderConfig,
    pub knowledge: Arc<KnowledgeBase>,
    pub max_tool_rounds: usize,
}

impl AppState {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            provider_config: OpenAiProviderConfig {
                host: settings.backend.host.clone(),
                api_key: settings.backend.api_key.clone(),
                timeout_secs: settings.backend.timeout_secs,
            },
            knowledge: Arc::new(KnowledgeBase::builtin()),
            max_tool_rounds: settings.backend.max_tool_rounds,
        }
    }
}
