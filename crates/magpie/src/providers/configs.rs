#[derive(Debug, Clone)]
pub struct OpenAiProviderConfig {
    pub host: String,
    pub api_key: String,
    pub timeout_secs: u64,
}

impl Default for OpenAiProviderConfig {
    fn default() -> Self {
        Self {
            host: "https://api.openai.com".to_string(),
            api_key: String::new(),
            timeout_secs: 600,
        }
    }
}
