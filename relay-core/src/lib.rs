//! # relay-core
//!
//! Core types and traits for the Telegram ⇄ NATS relay: [`Sink`], [`EnvelopeHandler`],
//! [`ChatHandler`], inbound envelopes and chat events, the error taxonomy, and tracing
//! initialisation. Transport-agnostic; used by aggregator, bus, relay-telegram and relay-bot.

pub mod error;
pub mod logger;
pub mod sink;
pub mod text;
pub mod types;

pub use error::{DecodeError, HandlerError, RelayError, Result, SinkError};
pub use logger::init_tracing;
pub use sink::{Sent, Sink};
pub use text::{content_hash, defuse_mentions, truncate_chars};
pub use types::{
    ChatContent, ChatEvent, ChatHandler, ChatUser, EnvelopeHandler, InboundEnvelope,
    InboundEvent, ReplyContext, StatusData, ThreadId, ToChatEvent, END_STATUS,
};
