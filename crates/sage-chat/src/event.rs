use crate::error::ChatError;

/// Normalized events emitted by an `ExchangeStream`.
///
/// Exactly one terminal event (`Completed`, `Failed`, or `Cancelled`) is
/// emitted per exchange; fragments arrive strictly in wire order.
#[derive(Clone, Debug, PartialEq)]
pub enum ExchangeEvent {
    /// First event for every exchange.
    Started {
        exchange_id: uuid::Uuid,
        session_id: uuid::Uuid,
        model: String,
    },
    /// Incremental content fragment with a monotonically increasing sequence
    /// number.
    Fragment {
        exchange_id: uuid::Uuid,
        seq: u64,
        text: String,
    },
    /// Terminal success; `text` is the full accumulated answer.
    Completed {
        exchange_id: uuid::Uuid,
        text: String,
        finish_reason: Option<String>,
    },
    /// Terminal failure.
    Failed {
        exchange_id: uuid::Uuid,
        error: ChatError,
    },
    /// Terminal cancellation requested by the caller.
    Cancelled { exchange_id: uuid::Uuid },
}

impl ExchangeEvent {
    /// Whether this event ends the exchange.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed { .. } | Self::Failed { .. } | Self::Cancelled { .. }
        )
    }
}
