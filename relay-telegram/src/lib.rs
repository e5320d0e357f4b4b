//! # relay-telegram
//!
//! Telegram side of the relay: [`TelegramSink`] (a [`relay_core::Sink`] posting into forum
//! topics), adapters to [`relay_core::ChatEvent`], chat → server command translation, and the
//! REPL runner. No bus or aggregation logic.

mod adapters;
mod bot_adapter;
mod command;
mod config;
mod runner;

pub use adapters::{TelegramMessageWrapper, TelegramUserWrapper};
pub use bot_adapter::{map_request_error, parse_recipient, TelegramSink};
pub use command::{escape, CommandTranslator, CustomCommand, Templates, SAY_MAX_CHARS};
pub use config::TelegramConfig;
pub use runner::{ensure_relayed_chat, run_repl};
