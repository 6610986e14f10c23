//! Streaming chat-completion client for the Sage assistant.
//!
//! Turns a user prompt (plus optional quoted context, prior history, and a
//! tier flag) into an incrementally delivered answer over an SSE stream, with
//! cancellation, error classification, and a tier-based prompt/model/budget
//! policy. Host concerns (message insertion, persistence, entitlement
//! checks, usage limits) stay with the caller.
//!
//! # Builder-first usage
//!
//! ```no_run
//! use sage_chat::prelude::*;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), ChatError> {
//! let client = ChatClient::chat_completions(
//!     BackendKind::OpenAi,
//!     ChatConfig::from_env(BackendKind::OpenAi)?,
//! )?;
//!
//! let mut exchange = client
//!     .session(SessionConfig::named("thread"))
//!     .submit("Is the Great Wall visible from space?")
//!     .context("forwarded from the group chat")
//!     .tier(Tier::Standard)
//!     .start_stream()
//!     .await?;
//!
//! while let Some(event) = exchange.next_event().await {
//!     match event {
//!         ExchangeEvent::Fragment { text, .. } => print!("{text}"),
//!         ExchangeEvent::Completed { .. } => println!(),
//!         ExchangeEvent::Failed { error, .. } => eprintln!("exchange failed: {error}"),
//!         _ => {}
//!     }
//! }
//! # Ok(())
//! # }
//! ```

/// Backend adapter seam and the chat-completions implementation.
pub mod backend;
/// Client entry point and builder.
pub mod client;
/// Outbound message-list assembly.
pub mod compose;
/// Client/backend configuration.
pub mod config;
/// Public error taxonomy.
pub mod error;
/// Normalized exchange events.
pub mod event;
/// Exchange builder, streaming handle, and cancellation handle.
pub mod exchange;
/// Chat message data model.
pub mod message;
/// Tier policy table.
pub mod policy;
/// Common imports for typical usage.
pub mod prelude;
/// Per-conversation sessions.
pub mod session;

pub use backend::{
    BackendAdapter, BackendEvent, BackendKind, BackendRequest, BackendStreamHandle,
    ChatCompletionsBackend,
};
pub use client::{ChatClient, ChatClientBuilder};
pub use compose::{WireMessage, compose};
pub use config::ChatConfig;
pub use error::{BackendError, ChatError};
pub use event::ExchangeEvent;
pub use exchange::{CancelHandle, ExchangeBuilder, ExchangeStream};
pub use message::{ChatMessage, Role};
pub use policy::{PolicyDefaults, RequestPolicy, Tier};
pub use session::{ChatSession, SessionConfig};
