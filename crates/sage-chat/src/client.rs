use std::sync::Arc;

use crate::backend::{BackendAdapter, BackendKind, ChatCompletionsBackend};
use crate::config::ChatConfig;
use crate::error::ChatError;
use crate::policy::PolicyDefaults;
use crate::session::{ChatSession, SessionConfig};

pub(crate) struct ClientInner {
    pub(crate) backend: Arc<dyn BackendAdapter>,
    pub(crate) defaults: PolicyDefaults,
}

/// Entry point for creating sessions and running exchanges.
///
/// One client talks to exactly one backend deployment; routing across
/// providers is out of scope.
#[derive(Clone)]
pub struct ChatClient {
    pub(crate) inner: Arc<ClientInner>,
}

impl ChatClient {
    /// Starts a builder for wiring a backend and policy defaults.
    pub fn builder() -> ChatClientBuilder {
        ChatClientBuilder::default()
    }

    /// Convenience constructor for a chat-completions deployment.
    ///
    /// Policy defaults (standard-tier model, token cap, temperature) are
    /// taken from the same config the backend authenticates with.
    pub fn chat_completions(kind: BackendKind, config: ChatConfig) -> Result<Self, ChatError> {
        let defaults = PolicyDefaults::from(&config);
        let backend = ChatCompletionsBackend::new(kind, config)?;
        Self::builder()
            .backend(Arc::new(backend))
            .defaults(defaults)
            .build()
    }

    /// Creates an isolated session for one conversation thread.
    ///
    /// Sessions share no mutable state; each carries its own single-flight
    /// gate.
    pub fn session(&self, config: SessionConfig) -> ChatSession {
        ChatSession::new(self.inner.clone(), config)
    }
}

/// Builder used to wire a backend adapter before creating a `ChatClient`.
#[derive(Default)]
pub struct ChatClientBuilder {
    backend: Option<Arc<dyn BackendAdapter>>,
    defaults: Option<PolicyDefaults>,
}

impl ChatClientBuilder {
    /// Sets the backend adapter for this deployment.
    pub fn backend(mut self, backend: Arc<dyn BackendAdapter>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Overrides the standard-tier policy defaults.
    ///
    /// When omitted, the backend kind's built-in defaults apply.
    pub fn defaults(mut self, defaults: PolicyDefaults) -> Self {
        self.defaults = Some(defaults);
        self
    }

    /// Builds the client.
    pub fn build(self) -> Result<ChatClient, ChatError> {
        let backend = self
            .backend
            .ok_or_else(|| ChatError::Config("a backend adapter is required".into()))?;
        let defaults = self
            .defaults
            .unwrap_or_else(|| PolicyDefaults::for_kind(backend.kind()));
        Ok(ChatClient {
            inner: Arc::new(ClientInner { backend, defaults }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_without_backend_is_a_config_error() {
        let result = ChatClient::builder().build();
        assert!(matches!(result, Err(ChatError::Config(_))));
    }

    #[test]
    fn chat_completions_constructor_rejects_blank_keys() {
        let result =
            ChatClient::chat_completions(BackendKind::OpenAi, ChatConfig::new("", "gpt-4o"));
        assert!(matches!(result, Err(ChatError::Config(_))));
    }
}
