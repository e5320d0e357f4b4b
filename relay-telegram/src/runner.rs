//! REPL runner: converts teloxide messages from the relayed chat into [`ChatEvent`]s and hands
//! them to a [`ChatHandler`].
//!
//! [`ChatEvent`]: relay_core::ChatEvent

use std::sync::Arc;

use anyhow::Result;
use relay_core::{ChatHandler, HandlerError, ToChatEvent};
use teloxide::prelude::*;
use teloxide::types::Recipient;
use tracing::{debug, error, info, instrument};

use crate::adapters::TelegramMessageWrapper;

/// Rejects messages that did not come from `chat`.
pub fn ensure_relayed_chat(
    msg: &teloxide::types::Message,
    chat: &Recipient,
) -> std::result::Result<(), HandlerError> {
    let matches = match chat {
        Recipient::Id(id) => msg.chat.id == *id,
        Recipient::ChannelUsername(name) => {
            msg.chat.username() == Some(name.trim_start_matches('@'))
        }
    };
    if matches {
        Ok(())
    } else {
        Err(HandlerError::ForeignChat)
    }
}

/// Starts the long-polling REPL. Every message from `chat` is converted and handled on its own
/// task so a slow publish never stalls polling.
#[instrument(skip(bot, handler))]
pub async fn run_repl(bot: teloxide::Bot, handler: Arc<dyn ChatHandler>, chat: Recipient) -> Result<()> {
    if let Ok(me) = bot.get_me().await {
        if let Some(username) = &me.user.username {
            info!(username = %username, "Polling as bot");
        }
    }

    teloxide::repl(bot, move |_bot: Bot, msg: teloxide::types::Message| {
        let handler = handler.clone();
        let chat = chat.clone();

        async move {
            if let Err(e) = ensure_relayed_chat(&msg, &chat) {
                debug!(chat_id = msg.chat.id.0, reason = %e, "Ignoring message");
                return Ok(());
            }

            let event = TelegramMessageWrapper(&msg).to_chat_event();
            info!(
                user_id = event.sender.id,
                chat_id = event.chat_id,
                message_id = event.message_id,
                "Received message"
            );

            tokio::spawn(async move {
                if let Err(e) = handler.handle_chat(&event).await {
                    error!(error = %e, message_id = event.message_id, "Forwarding chat message failed");
                }
            });

            Ok(())
        }
    })
    .await;

    Ok(())
}
