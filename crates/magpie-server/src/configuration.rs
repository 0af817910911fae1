use config::{Config, ConfigError, Environment};
use serde::Deserialize;
use std::net::SocketAddr;

#[derive(Debug, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerSettings {
    pub fn socket_addr(&self) -> SocketAddr {
        format!("{}:{}", self.host, self.port)
            .parse()
            .expect("Failed to parse socket address")
    }
}

#[derive(Debug, Deserialize)]
pub struct BackendSettings {
    #[serde(default = "default_backend_host")]
    pub host: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_tool_rounds")]
    pub max_tool_rounds: usize,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            host: default_backend_host(),
            api_key: String::new(),
            timeout_secs: default_timeout_secs(),
            max_tool_rounds: default_max_tool_rounds(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub backend: BackendSettings,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(
                Environment::with_prefix("MAGPIE")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut settings: Settings = config.try_deserialize()?;

        // OPENAI_API_KEY is honored as a fallback for deployments that only
        // set the conventional variable.
        if settings.backend.api_key.is_empty() {
            if let Ok(key) = std::env::var("OPENAI_API_KEY") {
                settings.backend.api_key = key;
            }
        }

        Ok(settings)
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8001
}

fn default_backend_host() -> String {
    "https://api.openai.com".to_string()
}

fn default_timeout_secs() -> u64 {
    600
}

fn default_max_tool_rounds() -> usize {
    8
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    fn clean_env() {
        for (key, _) in env::vars() {
            if key.starts_with("MAGPIE_") {
                env::remove_var(&key);
            }
        }
        env::remove_var("OPENAI_API_KEY");
    }

    #[test]
    #[serial]
    fn test_default_settings() {
        clean_env();

        let settings = Settings::new().unwrap();
        assert_eq!(settings.server.host, "127.0.0.1");
        assert_eq!(settings.server.port, 8001);
        assert_eq!(settings.backend.host, "https://api.openai.com");
        assert_eq!(settings.backend.api_key, "");
        assert_eq!(settings.backend.timeout_secs, 600);
        assert_eq!(settings.backend.max_tool_rounds, 8);
    }

    #[test]
    #[serial]
    fn test_environment_override() {
        clean_env();
        env::set_var("MAGPIE_SERVER__PORT", "9009");
        env::set_var("MAGPIE_BACKEND__HOST", "https://llm.internal");
        env::set_var("MAGPIE_BACKEND__API_KEY", "test-key");
        env::set_var("MAGPIE_BACKEND__MAX_TOOL_ROUNDS", "3");

        let settings = Settings::new().unwrap();
        assert_eq!(settings.server.port, 9009);
        assert_eq!(settings.backend.host, "https://llm.internal");
        assert_eq!(settings.backend.api_key, "test-key");
        assert_eq!(settings.backend.max_tool_rounds, 3);

        clean_env();
    }

    #[test]
    #[serial]
    fn test_openai_api_key_fallback() {
        clean_env();
        env::set_var("OPENAI_API_KEY", "fallback-key");

        let settings = Settings::new().unwrap();
        assert_eq!(settings.backend.api_key, "fallback-key");

        clean_env();
    }

    #[test]
    #[serial]
    fn test_explicit_key_wins_over_fallback() {
        clean_env();
        env::set_var("MAGPIE_BACKEND__API_KEY", "explicit-key");
        env::set_var("OPENAI_API_KEY", "fallback-key");

        let settings = Settings::new().unwrap();
        assert_eq!(settings.backend.api_key, "explicit-key");

        clean_env();
    }

    #[test]
    fn test_socket_addr_conversion() {
        let server_settings = ServerSettings {
            host: "127.0.0.1".to_string(),
            port: 8001,
        };
        let addr = server_settings.socket_addr();
        assert_eq!(addr.to_string(), "127.0.0.1:8001");
    }
}
