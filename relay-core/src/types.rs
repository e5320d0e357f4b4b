//! Core types: thread ids, inbound bus envelopes, chat events, and the handler traits both
//! directions of the relay are driven through.

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::DecodeError;

/// User id value that closes a status poll.
pub const END_STATUS: &str = "end_status";

/// Conversation sub-channel id. The bus sends either an integer or a string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ThreadId {
    Int(i64),
    Name(String),
}

impl ThreadId {
    /// Telegram forum topic id, if this thread id can address one.
    pub fn telegram_thread(&self) -> Option<i32> {
        match self {
            ThreadId::Int(id) => i32::try_from(*id).ok(),
            ThreadId::Name(name) => name.trim().parse().ok(),
        }
    }
}

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThreadId::Int(id) => write!(f, "{}", id),
            ThreadId::Name(name) => f.write_str(name),
        }
    }
}

impl From<i64> for ThreadId {
    fn from(id: i64) -> Self {
        ThreadId::Int(id)
    }
}

impl From<&str> for ThreadId {
    fn from(name: &str) -> Self {
        ThreadId::Name(name.to_string())
    }
}

/// Structured status payload (one player per event, terminated by [`END_STATUS`]).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusData {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub user_id: Option<String>,
}

fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<serde_json::Value>::deserialize(deserializer)? {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

/// Decoded bus message. Transient: lives for the handling of one message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundEnvelope {
    #[serde(default)]
    pub server_name: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    pub message_thread_id: ThreadId,
    pub regex_type: String,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub data: Option<StatusData>,
}

/// What an envelope asks the aggregator to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent<'a> {
    /// A chat line; `name` may be empty.
    Line { name: Option<&'a str>, text: &'a str },
    /// One participant of an in-progress status poll.
    RosterEntry(&'a str),
    /// Status poll finished; the roster should be flushed.
    RosterEnd,
}

impl InboundEnvelope {
    /// Decodes a raw bus payload.
    pub fn decode(payload: &[u8]) -> std::result::Result<Self, DecodeError> {
        let text = std::str::from_utf8(payload)?;
        let envelope: InboundEnvelope = serde_json::from_str(text)?;
        envelope.event()?;
        Ok(envelope)
    }

    pub fn thread_id(&self) -> &ThreadId {
        &self.message_thread_id
    }

    /// Classifies the envelope. Text wins over status data when both are present.
    pub fn event(&self) -> std::result::Result<InboundEvent<'_>, DecodeError> {
        if let Some(text) = self.text.as_deref() {
            return Ok(InboundEvent::Line {
                name: self.name.as_deref(),
                text,
            });
        }
        match &self.data {
            Some(data) => match data.name.as_deref() {
                Some(name) if data.user_id.as_deref() != Some(END_STATUS) => {
                    Ok(InboundEvent::RosterEntry(name))
                }
                _ => Ok(InboundEvent::RosterEnd),
            },
            None => Err(DecodeError::Empty(self.message_thread_id.to_string())),
        }
    }
}

/// Sender of a chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatUser {
    pub id: u64,
    pub first_name: String,
    pub last_name: Option<String>,
}

impl ChatUser {
    /// First and last name glued together, the way game chat shows Telegram users.
    pub fn display_name(&self) -> String {
        format!("{}{}", self.first_name, self.last_name.as_deref().unwrap_or(""))
    }
}

/// Payload kind of a chat message, decided once when the message is adapted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChatContent {
    Text(String),
    Sticker { emoji: Option<String> },
    Video,
    Photo,
    Audio,
    Voice,
    None,
}

/// The message a chat event replies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyContext {
    pub message_id: i32,
    pub sender: ChatUser,
    pub text: Option<String>,
}

/// A chat message headed for the bus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatEvent {
    pub message_id: i32,
    pub chat_id: i64,
    pub thread_id: Option<ThreadId>,
    pub sender: ChatUser,
    pub date: DateTime<Utc>,
    pub content: ChatContent,
    pub caption: Option<String>,
    pub reply_to: Option<ReplyContext>,
}

/// Converts a transport-specific message into a [`ChatEvent`].
pub trait ToChatEvent: Send + Sync {
    fn to_chat_event(&self) -> ChatEvent;
}

/// Consumes decoded bus envelopes (bus → chat direction).
#[async_trait]
pub trait EnvelopeHandler: Send + Sync {
    async fn handle_envelope(&self, envelope: InboundEnvelope);
}

/// Consumes chat events (chat → bus direction).
#[async_trait]
pub trait ChatHandler: Send + Sync {
    async fn handle_chat(&self, event: &ChatEvent) -> crate::error::Result<()>;
}
