use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures::StreamExt as _;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::debug;

use crate::backend::{BackendAdapter, BackendEvent, BackendRequest};
use crate::client::ClientInner;
use crate::compose::compose;
use crate::error::ChatError;
use crate::event::ExchangeEvent;
use crate::message::ChatMessage;
use crate::policy::{RequestPolicy, Tier};

const DEFAULT_BUFFER_CAPACITY: usize = 128;

/// Handle used to request cancellation of a running exchange.
///
/// Cancelling is idempotent; cancelling an exchange that already reached a
/// terminal state is a no-op.
#[derive(Clone)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    /// Requests cancellation.
    ///
    /// The underlying connection is closed within one I/O step and the
    /// exchange resolves as `Cancelled`, never `Completed` or `Failed`.
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }
}

/// Builder for configuring and starting a single exchange.
///
/// Created by `ChatSession::submit`; supply the optional context, history,
/// and tier before streaming or collecting the answer.
pub struct ExchangeBuilder {
    client: Arc<ClientInner>,
    session_id: uuid::Uuid,
    gate: Arc<AtomicBool>,
    text: String,
    context: Option<String>,
    history: Vec<ChatMessage>,
    tier: Tier,
    timeout: Option<Duration>,
    buffer_capacity: usize,
}

impl ExchangeBuilder {
    pub(crate) fn new(
        client: Arc<ClientInner>,
        session_id: uuid::Uuid,
        gate: Arc<AtomicBool>,
        text: String,
    ) -> Self {
        Self {
            client,
            session_id,
            gate,
            text,
            context: None,
            history: Vec::new(),
            tier: Tier::Standard,
            timeout: None,
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
        }
    }

    /// Attaches a quoted prior-conversation snippet as background context.
    pub fn context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Supplies prior turns to forward verbatim (role and order preserved).
    pub fn history(mut self, history: Vec<ChatMessage>) -> Self {
        self.history = history;
        self
    }

    /// Selects the prompt/model/budget tier for this exchange.
    pub fn tier(mut self, tier: Tier) -> Self {
        self.tier = tier;
        self
    }

    /// Sets an optional per-exchange timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the bounded event buffer size between the runtime task and the
    /// consumer.
    pub fn buffer_capacity(mut self, capacity: usize) -> Self {
        self.buffer_capacity = capacity;
        self
    }

    /// Validates the builder state and starts a streaming exchange.
    ///
    /// Fails with `ChatError::Busy` when a prior exchange for the same
    /// session has not reached a terminal state yet.
    pub async fn start_stream(self) -> Result<ExchangeStream, ChatError> {
        if self.text.trim().is_empty() {
            return Err(ChatError::Validation(
                "input text must not be empty".into(),
            ));
        }
        if self.buffer_capacity == 0 {
            return Err(ChatError::Validation(
                "buffer_capacity must be greater than 0".into(),
            ));
        }
        if self
            .gate
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(ChatError::Busy);
        }
        let flight = FlightGuard(self.gate.clone());

        let backend = self.client.backend.clone();
        let policy = RequestPolicy::resolve(backend.kind(), self.tier, &self.client.defaults);
        let messages = compose(
            &policy.system_prompt,
            self.context.as_deref(),
            &self.history,
            &self.text,
        );
        let request = BackendRequest {
            exchange_id: uuid::Uuid::new_v4(),
            session_id: self.session_id,
            messages,
            policy,
            timeout: self.timeout,
        };

        let (tx, rx) = mpsc::channel(self.buffer_capacity);
        let (final_tx, final_rx) = oneshot::channel();
        let (cancel_tx, cancel_rx) = watch::channel(false);

        let cancel_handle = CancelHandle { tx: cancel_tx };
        let exchange_id = request.exchange_id;
        let session_id = request.session_id;
        let model = request.policy.model.clone();
        tokio::spawn(run_exchange(
            backend, request, tx, final_tx, cancel_rx, flight,
        ));

        Ok(ExchangeStream {
            exchange_id,
            session_id,
            model,
            rx,
            final_rx,
            cancel_handle,
            saw_terminal: false,
        })
    }

    /// Runs to completion and returns the full answer text.
    pub async fn collect_text(self) -> Result<String, ChatError> {
        let stream = self.start_stream().await?;
        stream.finish().await
    }
}

/// Releases the session's single-flight gate when the exchange terminates.
struct FlightGuard(Arc<AtomicBool>);

impl FlightGuard {
    fn release(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        self.release();
    }
}

/// Streaming handle returned by `ExchangeBuilder::start_stream`.
///
/// Use `next_event()` to consume events as they arrive and `finish()` to
/// obtain the final text after the terminal event.
pub struct ExchangeStream {
    exchange_id: uuid::Uuid,
    session_id: uuid::Uuid,
    model: String,
    rx: mpsc::Receiver<ExchangeEvent>,
    final_rx: oneshot::Receiver<Result<String, ChatError>>,
    cancel_handle: CancelHandle,
    saw_terminal: bool,
}

impl ExchangeStream {
    /// Returns the exchange id for this stream.
    pub fn exchange_id(&self) -> uuid::Uuid {
        self.exchange_id
    }

    /// Returns the session id that owns this exchange.
    pub fn session_id(&self) -> uuid::Uuid {
        self.session_id
    }

    /// Returns the resolved model identifier.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Returns a handle that can cancel the exchange.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel_handle.clone()
    }

    /// Waits for and returns the next exchange event.
    ///
    /// Returns `None` after the event channel is closed.
    pub async fn next_event(&mut self) -> Option<ExchangeEvent> {
        let event = self.rx.recv().await;
        if let Some(event) = &event
            && event.is_terminal()
        {
            self.saw_terminal = true;
        }
        event
    }

    /// Drains the stream (if needed) and returns the terminal result.
    ///
    /// Safe to call after consuming events manually with `next_event()`.
    pub async fn finish(mut self) -> Result<String, ChatError> {
        while !self.saw_terminal {
            match self.rx.recv().await {
                Some(event) if event.is_terminal() => self.saw_terminal = true,
                Some(_) => {}
                None => break,
            }
        }

        match self.final_rx.await {
            Ok(result) => result,
            Err(_) => Err(ChatError::protocol_msg(format!(
                "exchange task ended without final result (model={})",
                self.model
            ))),
        }
    }
}

async fn wait_cancelled(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow() {
            return;
        }
        if rx.changed().await.is_err() {
            // All cancel handles dropped; cancellation can never fire.
            futures::future::pending::<()>().await;
        }
    }
}

async fn run_exchange(
    backend: Arc<dyn BackendAdapter>,
    request: BackendRequest,
    tx: mpsc::Sender<ExchangeEvent>,
    final_tx: oneshot::Sender<Result<String, ChatError>>,
    mut cancel_rx: watch::Receiver<bool>,
    flight: FlightGuard,
) {
    let exchange_id = request.exchange_id;
    let session_id = request.session_id;
    let model = request.policy.model.clone();

    if !send_event(
        &tx,
        ExchangeEvent::Started {
            exchange_id,
            session_id,
            model: model.clone(),
        },
    )
    .await
    {
        flight.release();
        let _ = final_tx.send(Err(ChatError::protocol_msg(
            "exchange receiver dropped before Started",
        )));
        return;
    }

    // Awaiting the first byte; cancellation is honored here too.
    let started = tokio::select! {
        _ = wait_cancelled(&mut cancel_rx) => {
            flight.release();
            let _ = send_event(&tx, ExchangeEvent::Cancelled { exchange_id }).await;
            let _ = final_tx.send(Err(ChatError::Cancelled));
            return;
        }
        started = backend.start_stream(request) => started,
    };
    let mut handle = match started {
        Ok(handle) => handle,
        Err(err) => {
            let error = ChatError::from(err);
            flight.release();
            let _ = send_event(&tx, ExchangeEvent::Failed { exchange_id, error: error.clone() })
                .await;
            let _ = final_tx.send(Err(error));
            return;
        }
    };

    let mut seq = 0_u64;
    let mut accumulated = String::new();
    loop {
        tokio::select! {
            _ = wait_cancelled(&mut cancel_rx) => {
                // Dropping the handle closes the connection.
                drop(handle);
                flight.release();
                let _ = send_event(&tx, ExchangeEvent::Cancelled { exchange_id }).await;
                let _ = final_tx.send(Err(ChatError::Cancelled));
                return;
            }
            next = handle.stream.next() => {
                match next {
                    Some(Ok(BackendEvent::Delta { text })) => {
                        if text.is_empty() {
                            continue;
                        }
                        debug!(exchange_id = %exchange_id, model = %model, seq, "content fragment");
                        accumulated.push_str(&text);
                        let sent = send_event(&tx, ExchangeEvent::Fragment { exchange_id, seq, text }).await;
                        seq = seq.saturating_add(1);
                        if !sent {
                            flight.release();
                            let _ = final_tx.send(Err(ChatError::protocol_msg("exchange receiver dropped during streaming")));
                            return;
                        }
                    }
                    Some(Ok(BackendEvent::Done { finish_reason })) => {
                        flight.release();
                        let sent = send_event(&tx, ExchangeEvent::Completed {
                            exchange_id,
                            text: accumulated.clone(),
                            finish_reason,
                        }).await;
                        let _ = final_tx.send(if sent {
                            Ok(accumulated)
                        } else {
                            Err(ChatError::protocol_msg("exchange receiver dropped before completion"))
                        });
                        return;
                    }
                    Some(Err(err)) => {
                        let error = ChatError::from(err);
                        flight.release();
                        let _ = send_event(&tx, ExchangeEvent::Failed { exchange_id, error: error.clone() }).await;
                        let _ = final_tx.send(Err(error));
                        return;
                    }
                    None => {
                        // Clean close without an explicit Done; treated as a
                        // normal end of stream.
                        flight.release();
                        let sent = send_event(&tx, ExchangeEvent::Completed {
                            exchange_id,
                            text: accumulated.clone(),
                            finish_reason: None,
                        }).await;
                        let _ = final_tx.send(if sent {
                            Ok(accumulated)
                        } else {
                            Err(ChatError::protocol_msg("exchange receiver dropped before completion"))
                        });
                        return;
                    }
                }
            }
        }
    }
}

async fn send_event(tx: &mpsc::Sender<ExchangeEvent>, event: ExchangeEvent) -> bool {
    tx.send(event).await.is_ok()
}
