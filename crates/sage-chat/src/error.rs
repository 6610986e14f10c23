/// Errors produced by a backend adapter while opening or reading a stream.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    /// Endpoint returned a non-2xx status; the body is drained in full.
    #[error("chat endpoint returned status {status}: {body}")]
    Http { status: u16, body: String },
    /// Request could not be built or the connection could not be established.
    #[error("transport error: {message}")]
    Transport { message: String },
    /// The connection dropped or the read failed after the stream started.
    #[error("streaming error: {message}")]
    Streaming { message: String },
}

impl BackendError {
    /// Creates a transport-level error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Creates a mid-stream error.
    pub fn streaming(message: impl Into<String>) -> Self {
        Self::Streaming {
            message: message.into(),
        }
    }
}

/// Top-level error type for the public client API.
///
/// Terminal exchange events carry a clone of this error, so the type stays
/// `Clone + PartialEq`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChatError {
    /// Credential or client configuration is invalid; raised before any
    /// network I/O.
    #[error("config error: {0}")]
    Config(String),
    /// Invalid user input to the builder API.
    #[error("validation error: {0}")]
    Validation(String),
    /// DNS/connect/request failure before the first byte.
    #[error("transport error: {0}")]
    Transport(String),
    /// Non-2xx response; `body` holds the provider's diagnostic text verbatim.
    #[error("chat endpoint returned status {status}: {body}")]
    Http { status: u16, body: String },
    /// The stream broke after at least one byte was received. Fragments
    /// already delivered are never retracted.
    #[error("streaming error: {0}")]
    Streaming(String),
    /// The exchange was cancelled by the caller.
    #[error("exchange cancelled")]
    Cancelled,
    /// A prior exchange for the same session is still in flight.
    #[error("an exchange is already in flight for this session")]
    Busy,
    /// Internal invariant violation (for example the event receiver was
    /// dropped mid-run).
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl ChatError {
    pub(crate) fn protocol_msg(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }

    /// Whether the caller may reasonably retry the exchange.
    ///
    /// 429 and 5xx responses, transport failures, and mid-stream drops are
    /// classified retryable; other 4xx statuses (bad request, auth) are not.
    /// Retry policy itself lives in the caller.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http { status, .. } => *status == 429 || *status >= 500,
            Self::Transport(_) | Self::Streaming(_) => true,
            _ => false,
        }
    }
}

impl From<BackendError> for ChatError {
    fn from(value: BackendError) -> Self {
        match value {
            BackendError::Http { status, body } => ChatError::Http { status, body },
            BackendError::Transport { message } => ChatError::Transport(message),
            BackendError::Streaming { message } => ChatError::Streaming(message),
        }
    }
}
