//! Adapters from Telegram (teloxide) types to relay_core chat types.
//! Depends only on teloxide and relay_core type definitions.

use relay_core::{ChatContent, ChatEvent, ChatUser, ReplyContext, ThreadId, ToChatEvent};

/// Wraps a teloxide User for conversion to [`ChatUser`].
pub struct TelegramUserWrapper<'a>(pub &'a teloxide::types::User);

impl<'a> TelegramUserWrapper<'a> {
    pub fn to_chat_user(&self) -> ChatUser {
        ChatUser {
            id: self.0.id.0,
            first_name: self.0.first_name.clone(),
            last_name: self.0.last_name.clone(),
        }
    }
}

fn anonymous() -> ChatUser {
    ChatUser {
        id: 0,
        first_name: String::new(),
        last_name: None,
    }
}

/// Wraps a teloxide Message for conversion to [`ChatEvent`].
pub struct TelegramMessageWrapper<'a>(pub &'a teloxide::types::Message);

impl<'a> ToChatEvent for TelegramMessageWrapper<'a> {
    fn to_chat_event(&self) -> ChatEvent {
        let msg = self.0;
        ChatEvent {
            message_id: msg.id.0,
            chat_id: msg.chat.id.0,
            thread_id: msg.thread_id.map(|t| ThreadId::Int(i64::from(t.0 .0))),
            sender: self.sender(),
            date: msg.date,
            content: classify(msg),
            caption: msg.caption().map(str::to_string),
            reply_to: self.reply_context(),
        }
    }
}

impl<'a> TelegramMessageWrapper<'a> {
    fn sender(&self) -> ChatUser {
        self.0
            .from
            .as_ref()
            .map(|u| TelegramUserWrapper(u).to_chat_user())
            .unwrap_or_else(anonymous)
    }

    /// The replied-to message, if any. A forum topic's opening service message is not a reply.
    fn reply_context(&self) -> Option<ReplyContext> {
        let reply = self.0.reply_to_message()?;
        if self.0.thread_id.map(|t| t.0) == Some(reply.id) {
            return None;
        }
        Some(ReplyContext {
            message_id: reply.id.0,
            sender: reply
                .from
                .as_ref()
                .map(|u| TelegramUserWrapper(u).to_chat_user())
                .unwrap_or_else(anonymous),
            text: reply.text().map(str::to_string),
        })
    }
}

/// Decides the payload kind once. Stickers win over other media.
fn classify(msg: &teloxide::types::Message) -> ChatContent {
    if let Some(text) = msg.text() {
        return ChatContent::Text(text.to_string());
    }
    if let Some(sticker) = msg.sticker() {
        return ChatContent::Sticker {
            emoji: sticker.emoji.clone(),
        };
    }
    if msg.video().is_some() {
        ChatContent::Video
    } else if msg.photo().is_some() {
        ChatContent::Photo
    } else if msg.audio().is_some() {
        ChatContent::Audio
    } else if msg.voice().is_some() {
        ChatContent::Voice
    } else {
        ChatContent::None
    }
}
