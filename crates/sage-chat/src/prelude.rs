//! Common imports for typical client usage.
//!
//! Exports the builder/runtime types most application code needs so callers
//! get by with a single import line.
pub use crate::{
    BackendKind, CancelHandle, ChatClient, ChatConfig, ChatError, ChatMessage, ExchangeEvent,
    ExchangeStream, Role, SessionConfig, Tier,
};
