use std::time::Duration;

use crate::backend::BackendKind;
use crate::error::ChatError;

/// Client configuration for a chat-completions backend.
#[derive(Clone, Debug)]
pub struct ChatConfig {
    /// API key used for bearer auth.
    pub api_key: String,
    /// Default model for standard-tier exchanges.
    pub model: String,
    /// Default output token cap for standard-tier exchanges.
    pub max_tokens: Option<u32>,
    /// Sampling temperature; falls back to 0.7 when unset.
    pub temperature: Option<f32>,
    /// Base URL override (proxies or local test servers).
    pub base_url: Option<String>,
    /// Default HTTP timeout for requests.
    pub timeout: Duration,
}

impl ChatConfig {
    /// Creates a config with sensible defaults and a provided API key.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            max_tokens: None,
            temperature: None,
            base_url: None,
            timeout: Duration::from_secs(120),
        }
    }

    /// Builds a config from the backend's conventional environment variable
    /// (`OPENAI_API_KEY` or `XAI_API_KEY`).
    pub fn from_env(kind: BackendKind) -> Result<Self, ChatError> {
        let var = kind.api_key_env();
        let api_key = std::env::var(var).unwrap_or_default();
        if api_key.trim().is_empty() {
            return Err(ChatError::Config(format!(
                "missing {var} for {} backend",
                kind.as_str()
            )));
        }
        Ok(Self::new(api_key, kind.default_model()))
    }

    /// Whether the config carries a usable credential.
    pub fn is_configured(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    /// Overrides the default output token cap.
    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Overrides the sampling temperature.
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Overrides the API base URL (for proxies or test servers).
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Overrides the default HTTP timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_key_is_not_configured() {
        let config = ChatConfig::new("   ", "gpt-4o");
        assert!(!config.is_configured());
        assert!(ChatConfig::new("sk-test", "gpt-4o").is_configured());
    }

    #[test]
    fn builder_setters_apply() {
        let config = ChatConfig::new("sk-test", "gpt-4o")
            .max_tokens(150)
            .temperature(0.2)
            .base_url("http://localhost:8080")
            .timeout(Duration::from_secs(5));
        assert_eq!(config.max_tokens, Some(150));
        assert_eq!(config.temperature, Some(0.2));
        assert_eq!(config.base_url.as_deref(), Some("http://localhost:8080"));
        assert_eq!(config.timeout, Duration::from_secs(5));
    }
}
