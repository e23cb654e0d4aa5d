//! Vision client configuration.
//!
//! Connection settings (endpoint, model, api key) usually come from the
//! environment; generation settings can live in the config file.
//!
//! Env vars: OPENAI_API_KEY, OPENAI_BASE_URL, OPENAI_MODEL

use std::fmt;

use serde::{Deserialize, Serialize};

use super::prompts::DEFAULT_SYSTEM_PROMPT;

pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1";

/// Configuration for the OpenAI-compatible vision client.
#[derive(Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Base URL of the API; `/chat/completions` is appended.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Vision-capable model (default: gpt-4o)
    #[serde(default = "default_model")]
    pub model: String,
    /// Bearer token. Never written back out.
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    /// Maximum tokens in the response
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Sampling temperature; the service default when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Replaces the built-in system instruction
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}
fn default_model() -> String {
    "gpt-4o".to_string()
}
fn default_max_tokens() -> u32 {
    300
}
fn default_timeout_secs() -> u64 {
    120
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_model(),
            api_key: None,
            max_tokens: default_max_tokens(),
            temperature: None,
            timeout_secs: default_timeout_secs(),
            system_prompt: None,
        }
    }
}

impl fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmConfig")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("timeout_secs", &self.timeout_secs)
            .field("system_prompt", &self.system_prompt.is_some())
            .finish()
    }
}

impl LlmConfig {
    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.to_string();
        self
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Override connection settings from the environment.
    pub fn apply_env(&mut self) {
        self.apply_overrides(env_non_empty);
    }

    /// Override connection settings from `lookup`; a value found there
    /// always beats the config file.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(key) = lookup("OPENAI_API_KEY") {
            self.api_key = Some(key);
        }
        if let Some(endpoint) = lookup("OPENAI_BASE_URL") {
            self.endpoint = endpoint;
        }
        if let Some(model) = lookup("OPENAI_MODEL") {
            self.model = model;
        }
    }

    /// Get the system prompt, using custom or default.
    pub fn get_system_prompt(&self) -> &str {
        self.system_prompt
            .as_deref()
            .unwrap_or(DEFAULT_SYSTEM_PROMPT)
    }

    /// The hosted OpenAI endpoint rejects unauthenticated requests;
    /// self-hosted compatible servers usually do not need a key.
    pub fn requires_api_key(&self) -> bool {
        self.endpoint.trim_end_matches('/') == DEFAULT_ENDPOINT
    }

    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.endpoint.trim_end_matches('/'))
    }
}

fn env_non_empty(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LlmConfig::default();
        assert_eq!(config.model, "gpt-4o");
        assert_eq!(config.max_tokens, 300);
        assert!(config.system_prompt.is_none());
        assert!(config.get_system_prompt().contains("\"tags\""));
        assert!(config.requires_api_key());
    }

    #[test]
    fn test_completions_url_trims_slash() {
        let config = LlmConfig::default().with_endpoint("http://localhost:11434/v1/");
        assert_eq!(
            config.completions_url(),
            "http://localhost:11434/v1/chat/completions"
        );
        assert!(!config.requires_api_key());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: LlmConfig = toml::from_str("model = \"gpt-4o-mini\"").unwrap();
        assert_eq!(config.model, "gpt-4o-mini");
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.timeout_secs, 120);
    }

    #[test]
    fn test_environment_beats_config_file() {
        let mut config: LlmConfig = toml::from_str(
            r#"
api_key = "sk-from-file"
endpoint = "http://file.example/v1"
model = "file-model"
"#,
        )
        .unwrap();

        config.apply_overrides(|name| match name {
            "OPENAI_API_KEY" => Some("sk-from-env".to_string()),
            "OPENAI_MODEL" => Some("env-model".to_string()),
            _ => None,
        });

        assert_eq!(config.api_key.as_deref(), Some("sk-from-env"));
        assert_eq!(config.model, "env-model");
        assert_eq!(config.endpoint, "http://file.example/v1");
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let config = LlmConfig::default().with_api_key("sk-secret");
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("sk-secret"));
        assert!(rendered.contains("redacted"));
    }
}
