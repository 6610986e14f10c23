//! Backend adapter seam and the concrete chat-completions implementation.
//!
//! Vendor differences (base URL, prompt/model tables, the xAI live-search
//! extension) live in `BackendKind` and the policy table; the wire protocol
//! itself is shared.

mod chat_completions;
pub(crate) mod transport;

pub use chat_completions::ChatCompletionsBackend;
pub use transport::{ChatCompletionChunk, ChunkDelta, SseLineDecoder, StreamChoice};

use std::pin::Pin;
use std::time::Duration;

use crate::compose::WireMessage;
use crate::error::BackendError;
use crate::policy::RequestPolicy;

/// Which chat-completions deployment a backend talks to.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum BackendKind {
    OpenAi,
    Xai,
}

impl BackendKind {
    /// Stable identifier used in logs and error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Xai => "xai",
        }
    }

    /// Default chat-completions base URL for this deployment.
    pub fn default_base_url(&self) -> &'static str {
        match self {
            Self::OpenAi => "https://api.openai.com",
            Self::Xai => "https://api.x.ai",
        }
    }

    /// Conventional environment variable holding the API key.
    pub fn api_key_env(&self) -> &'static str {
        match self {
            Self::OpenAi => "OPENAI_API_KEY",
            Self::Xai => "XAI_API_KEY",
        }
    }

    /// Default standard-tier model.
    pub fn default_model(&self) -> &'static str {
        match self {
            Self::OpenAi => "gpt-4o",
            Self::Xai => "grok-3-mini",
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fully resolved request handed to a backend adapter.
#[derive(Clone, Debug)]
pub struct BackendRequest {
    pub exchange_id: uuid::Uuid,
    pub session_id: uuid::Uuid,
    /// Ordered message list produced by the composer.
    pub messages: Vec<WireMessage>,
    /// Resolved tier policy (model, token cap, temperature, extensions).
    pub policy: RequestPolicy,
    /// Optional per-exchange timeout overriding the client default.
    pub timeout: Option<Duration>,
}

/// Normalized event produced by a backend stream.
#[derive(Clone, Debug, PartialEq)]
pub enum BackendEvent {
    /// Incremental content fragment, in wire order.
    Delta { text: String },
    /// The stream terminated normally (`[DONE]` sentinel or clean close).
    Done { finish_reason: Option<String> },
}

/// Live stream handle returned by `BackendAdapter::start_stream`.
///
/// Dropping the handle closes the underlying connection; cancellation relies
/// on this to stop the transfer within one I/O step.
pub struct BackendStreamHandle {
    pub stream: Pin<Box<dyn futures::Stream<Item = Result<BackendEvent, BackendError>> + Send>>,
}

/// Contract a chat backend implements for the exchange runtime.
///
/// This is the injection seam: production uses `ChatCompletionsBackend`,
/// tests substitute fakes.
#[async_trait::async_trait]
pub trait BackendAdapter: Send + Sync {
    /// Identifies the deployment this adapter talks to.
    fn kind(&self) -> BackendKind;

    /// Opens the streaming connection for one exchange.
    ///
    /// Fails without yielding events on configuration, transport, or non-2xx
    /// HTTP errors; after a successful start all failures surface through the
    /// returned stream.
    async fn start_stream(&self, req: BackendRequest)
    -> Result<BackendStreamHandle, BackendError>;
}
