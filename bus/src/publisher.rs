//! Outbound publishing of game-server commands (chat → bus).

use async_nats::{header::NATS_MESSAGE_ID, jetstream, HeaderMap};
use async_trait::async_trait;
use bytes::Bytes;
use relay_core::{content_hash, HandlerError, RelayError, Result, ThreadId};
use tracing::{debug, instrument};

use crate::subjects::SubjectScheme;

/// A command line for one game-server thread, with its deduplication key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundCommand {
    pub thread: ThreadId,
    pub body: String,
    pub msg_id: String,
}

/// Deduplication key: the same chat message published twice is stored once by the stream.
pub fn idempotency_key(sender_id: u64, timestamp: i64, body: &str, chat_id: i64) -> String {
    format!("{}_{}_{}_{}", sender_id, timestamp, content_hash(body), chat_id)
}

#[async_trait]
pub trait CommandPublisher: Send + Sync {
    async fn publish(&self, command: OutboundCommand) -> Result<()>;
}

/// Publishes commands to JetStream and waits for the stream's ack.
pub struct NatsPublisher {
    js: jetstream::Context,
    scheme: SubjectScheme,
}

impl NatsPublisher {
    pub fn new(js: jetstream::Context, scheme: SubjectScheme) -> Self {
        Self { js, scheme }
    }
}

#[async_trait]
impl CommandPublisher for NatsPublisher {
    #[instrument(skip(self, command), fields(thread_id = %command.thread))]
    async fn publish(&self, command: OutboundCommand) -> Result<()> {
        let subject = self.scheme.outbound_subject(&command.thread);
        let mut headers = HeaderMap::new();
        headers.insert(NATS_MESSAGE_ID, command.msg_id.as_str());

        let ack = self
            .js
            .publish_with_headers(subject.clone(), headers, Bytes::from(command.body))
            .await
            .map_err(|e| RelayError::from(HandlerError::Publish(e.to_string())))?;
        ack.await
            .map_err(|e| RelayError::from(HandlerError::Publish(e.to_string())))?;

        debug!(subject = %subject, msg_id = %command.msg_id, "Command published");
        Ok(())
    }
}
