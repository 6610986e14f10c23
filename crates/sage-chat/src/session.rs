use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use crate::client::ClientInner;
use crate::exchange::ExchangeBuilder;

/// Configuration used to create a `ChatSession`.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// Human-readable session name (useful for logs).
    pub name: String,
}

impl SessionConfig {
    /// Creates a named session config.
    pub fn named(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// One conversation thread's handle into the client.
///
/// At most one exchange per session is in flight at a time: submitting while
/// a prior exchange is still streaming fails with `ChatError::Busy` rather
/// than implicitly cancelling it. Independent sessions are fully isolated.
#[derive(Clone)]
pub struct ChatSession {
    client: Arc<ClientInner>,
    session_id: uuid::Uuid,
    config: SessionConfig,
    in_flight: Arc<AtomicBool>,
}

impl ChatSession {
    pub(crate) fn new(client: Arc<ClientInner>, config: SessionConfig) -> Self {
        Self {
            client,
            session_id: uuid::Uuid::new_v4(),
            config,
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Returns the session id.
    pub fn session_id(&self) -> uuid::Uuid {
        self.session_id
    }

    /// Returns the session name.
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Starts building an exchange for the given user input.
    ///
    /// The text is validated (non-empty after trimming) when the exchange
    /// starts, before any network I/O.
    pub fn submit(&self, text: impl Into<String>) -> ExchangeBuilder {
        ExchangeBuilder::new(
            self.client.clone(),
            self.session_id,
            self.in_flight.clone(),
            text.into(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ChatError;
    use crate::event::ExchangeEvent;
    use crate::exchange::tests::{FakeBehavior, client_with};
    use crate::backend::BackendEvent;

    #[tokio::test]
    async fn resubmit_while_streaming_is_rejected_with_busy() {
        let client = client_with(FakeBehavior::EventsThenPending(vec![]));
        let session = client.session(SessionConfig::named("thread"));

        let stream = session
            .submit("first question")
            .start_stream()
            .await
            .expect("first exchange starts");

        let err = session
            .submit("second question")
            .start_stream()
            .await
            .err()
            .expect("second exchange must be rejected");
        assert_eq!(err, ChatError::Busy);

        // The first exchange is unaffected by the rejected submit.
        stream.cancel_handle().cancel();
        assert_eq!(stream.finish().await, Err(ChatError::Cancelled));
    }

    #[tokio::test]
    async fn session_is_reusable_after_a_terminal_exchange() {
        let client = client_with(FakeBehavior::Events(vec![
            Ok(BackendEvent::Delta { text: "ok".into() }),
            Ok(BackendEvent::Done {
                finish_reason: None,
            }),
        ]));
        let session = client.session(SessionConfig::named("thread"));

        let first = session
            .submit("one")
            .collect_text()
            .await
            .expect("first exchange");
        assert_eq!(first, "ok");

        let second = session
            .submit("two")
            .collect_text()
            .await
            .expect("second exchange after terminal state");
        assert_eq!(second, "ok");
    }

    #[tokio::test]
    async fn sessions_are_isolated_from_each_other() {
        let client = client_with(FakeBehavior::EventsThenPending(vec![]));
        let busy = client.session(SessionConfig::named("a"));
        let other = client.session(SessionConfig::named("b"));

        let mut held = busy
            .submit("blocks session a")
            .start_stream()
            .await
            .expect("start");
        let _ = held.next_event().await; // Started

        // Session b is free to start its own exchange.
        let stream = other
            .submit("independent")
            .start_stream()
            .await
            .expect("session b unaffected");
        assert_ne!(stream.session_id(), held.session_id());

        stream.cancel_handle().cancel();
        held.cancel_handle().cancel();
        assert!(matches!(
            stream.finish().await,
            Err(ChatError::Cancelled)
        ));
        let mut saw_cancelled = false;
        while let Some(event) = held.next_event().await {
            if matches!(event, ExchangeEvent::Cancelled { .. }) {
                saw_cancelled = true;
            }
        }
        assert!(saw_cancelled);
    }
}
