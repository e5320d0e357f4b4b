//! Chat → bus: translates chat events into server commands and publishes them.

use std::sync::Arc;

use async_trait::async_trait;
use bus::{idempotency_key, CommandPublisher, OutboundCommand};
use relay_core::{ChatEvent, ChatHandler, HandlerError, Result};
use relay_telegram::CommandTranslator;
use tracing::{debug, instrument};

pub struct ChatForwarder {
    translator: CommandTranslator,
    publisher: Arc<dyn CommandPublisher>,
}

impl ChatForwarder {
    pub fn new(translator: CommandTranslator, publisher: Arc<dyn CommandPublisher>) -> Self {
        Self {
            translator,
            publisher,
        }
    }

    /// The command an event would be published as, without publishing it.
    pub fn command_for(&self, event: &ChatEvent) -> std::result::Result<OutboundCommand, HandlerError> {
        let thread = event.thread_id.clone().ok_or(HandlerError::NoThread)?;
        let body = self
            .translator
            .translate(event)
            .ok_or(HandlerError::EmptyContent)?;
        let msg_id = idempotency_key(event.sender.id, event.date.timestamp(), &body, event.chat_id);
        Ok(OutboundCommand {
            thread,
            body,
            msg_id,
        })
    }
}

#[async_trait]
impl ChatHandler for ChatForwarder {
    #[instrument(skip(self, event), fields(message_id = event.message_id))]
    async fn handle_chat(&self, event: &ChatEvent) -> Result<()> {
        let command = self.command_for(event)?;
        debug!(thread_id = %command.thread, body = %command.body, "Publishing command");
        self.publisher.publish(command).await
    }
}
