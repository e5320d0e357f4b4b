//! Outbound sink abstraction.
//!
//! [`Sink`] is transport-agnostic; `relay-telegram` implements it with teloxide. A send either
//! lands or returns a [`SinkError`]; sinks never retry on their own.

use async_trait::async_trait;

use crate::error::SinkError;
use crate::types::ThreadId;

/// One credentialed sender able to post text into a chat thread.
#[async_trait]
pub trait Sink: Send + Sync {
    /// Posts `text` into `thread`.
    async fn send_text(&self, thread: &ThreadId, text: &str) -> Result<(), SinkError>;
}

/// Receipt for an accepted send: which sender of the pool carried it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sent {
    pub sender: usize,
}
