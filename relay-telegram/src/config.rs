//! Telegram connectivity settings: bot tokens, target chat, optional API URL override.

use std::sync::Arc;

use anyhow::Result;
use relay_core::Sink;
use teloxide::types::Recipient;
use tracing::error;

use crate::bot_adapter::{parse_recipient, TelegramSink};

#[derive(Debug, Clone)]
pub struct TelegramConfig {
    /// One bot per token; sends rotate across them.
    pub bot_tokens: Vec<String>,
    pub chat_id: String,
    pub telegram_api_url: Option<String>,
}

impl TelegramConfig {
    pub fn new(bot_tokens: Vec<String>, chat_id: impl Into<String>) -> Self {
        Self {
            bot_tokens,
            chat_id: chat_id.into(),
            telegram_api_url: None,
        }
    }

    pub fn recipient(&self) -> Recipient {
        parse_recipient(&self.chat_id)
    }

    /// Builds a bot for `token`, pointed at the API URL override when one is set.
    pub fn bot(&self, token: &str) -> teloxide::Bot {
        let bot = teloxide::Bot::new(token);
        match self.telegram_api_url.as_deref() {
            Some(url_str) => match reqwest::Url::parse(url_str) {
                Ok(url) => bot.set_api_url(url),
                Err(e) => {
                    error!(error = %e, url = %url_str, "Invalid TELEGRAM_API_URL, using default");
                    bot
                }
            },
            None => bot,
        }
    }

    /// The bot that polls for chat updates (the first token).
    pub fn polling_bot(&self) -> Result<teloxide::Bot> {
        let token = self
            .bot_tokens
            .first()
            .ok_or_else(|| anyhow::anyhow!("no Telegram bot token configured"))?;
        Ok(self.bot(token))
    }

    /// One sink per token, in configuration order.
    pub fn sinks(&self) -> Vec<Arc<dyn Sink>> {
        let chat = self.recipient();
        self.bot_tokens
            .iter()
            .map(|token| Arc::new(TelegramSink::new(self.bot(token), chat.clone())) as Arc<dyn Sink>)
            .collect()
    }
}
