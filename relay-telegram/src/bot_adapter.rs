//! Wraps teloxide::Bot and implements [`relay_core::Sink`]: one sender of the rotating pool,
//! posting into a forum topic of the relayed chat.

use async_trait::async_trait;
use relay_core::{Sink, SinkError, ThreadId};
use teloxide::{
    prelude::*,
    types::{MessageId, Recipient, ThreadId as TopicId},
    ApiError, RequestError,
};
use tracing::debug;

/// Parses a configured chat id: numeric ids address chats, anything else a public `@channel`.
pub fn parse_recipient(chat_id: &str) -> Recipient {
    let chat_id = chat_id.trim();
    match chat_id.parse::<i64>() {
        Ok(id) => Recipient::Id(ChatId(id)),
        Err(_) => Recipient::ChannelUsername(chat_id.to_string()),
    }
}

/// Sends text into forum topics of one chat through one bot token.
pub struct TelegramSink {
    bot: teloxide::Bot,
    chat: Recipient,
}

impl TelegramSink {
    pub fn new(bot: teloxide::Bot, chat: Recipient) -> Self {
        Self { bot, chat }
    }
}

#[async_trait]
impl Sink for TelegramSink {
    async fn send_text(&self, thread: &ThreadId, text: &str) -> Result<(), SinkError> {
        let topic = thread
            .telegram_thread()
            .ok_or_else(|| SinkError::Fatal(format!("thread id {} is not a forum topic", thread)))?;

        self.bot
            .send_message(self.chat.clone(), text.to_string())
            .message_thread_id(TopicId(MessageId(topic)))
            .await
            .map_err(map_request_error)?;
        debug!(thread_id = %thread, len = text.len(), "Message sent to topic");
        Ok(())
    }
}

/// Classifies a teloxide error. Nothing is retried here; the aggregator keeps the buffer.
pub fn map_request_error(err: RequestError) -> SinkError {
    match err {
        RequestError::RetryAfter(wait) => SinkError::RateLimited {
            retry_after_secs: u32::try_from(wait.duration().as_secs()).ok(),
        },
        RequestError::Api(api) => match api {
            ApiError::InvalidToken
            | ApiError::ChatNotFound
            | ApiError::BotBlocked
            | ApiError::BotKicked
            | ApiError::BotKickedFromSupergroup => SinkError::Fatal(api.to_string()),
            other => {
                let description = other.to_string();
                if description.to_ascii_lowercase().contains("thread not found") {
                    SinkError::Fatal(description)
                } else {
                    SinkError::Unknown(description)
                }
            }
        },
        other => SinkError::Unknown(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_BOT_TOKEN: &str = "test_bot_token_12345";

    fn sink_for(server: &mockito::ServerGuard) -> TelegramSink {
        let url = reqwest::Url::parse(&server.url()).unwrap();
        let bot = teloxide::Bot::new(TEST_BOT_TOKEN).set_api_url(url);
        TelegramSink::new(bot, parse_recipient("-100123"))
    }

    fn send_path() -> String {
        format!("/bot{}/sendMessage", TEST_BOT_TOKEN)
    }

    #[test]
    fn test_parse_recipient() {
        assert_eq!(parse_recipient("-100123"), Recipient::Id(ChatId(-100123)));
        assert_eq!(
            parse_recipient("@twchat"),
            Recipient::ChannelUsername("@twchat".to_string())
        );
    }

    /// **Test: a successful sendMessage reports success.**
    ///
    /// **Setup:** mock Telegram API answering sendMessage with ok.
    /// **Expected:** Ok(()), mock hit once.
    #[tokio::test]
    async fn test_send_text_ok() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", send_path().as_str())
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{
                "ok": true,
                "result": {
                    "message_id": 1,
                    "message_thread_id": 42,
                    "date": 1706529600,
                    "chat": {"id": -100123, "type": "supergroup", "title": "tw", "is_forum": true},
                    "from": {"id": 123456789, "is_bot": true, "first_name": "TestBot", "username": "testbot"},
                    "text": "alice: hi"
                }
            }"#,
            )
            .create_async()
            .await;

        let sink = sink_for(&server);
        sink.send_text(&ThreadId::Int(42), "alice: hi").await.unwrap();
        mock.assert_async().await;
    }

    /// **Test: HTTP 429 with retry_after maps to RateLimited.**
    #[tokio::test]
    async fn test_send_text_rate_limited() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", send_path().as_str())
            .with_status(429)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"ok": false, "error_code": 429, "description": "Too Many Requests: retry after 7", "parameters": {"retry_after": 7}}"#,
            )
            .create_async()
            .await;

        let sink = sink_for(&server);
        let err = sink.send_text(&ThreadId::Int(42), "x").await.unwrap_err();
        assert_eq!(err, SinkError::RateLimited { retry_after_secs: Some(7) });
        assert!(err.is_transient());
    }

    /// **Test: a thread id that cannot address a topic is fatal without calling the API.**
    #[tokio::test]
    async fn test_non_numeric_thread_is_fatal() {
        let server = mockito::Server::new_async().await;
        let sink = sink_for(&server);
        let err = sink
            .send_text(&ThreadId::Name("general".to_string()), "x")
            .await
            .unwrap_err();
        assert!(err.is_fatal());
    }
}
