//! Inbound consumer: durable JetStream pull consumer feeding an [`InboundRouter`].
//!
//! The router decodes each payload, terminates malformed ones, and acknowledges well-formed ones
//! before handing them to one worker task per thread id. A backed-up worker therefore never
//! outlives the ack deadline and causes a redelivery; the bus side is at-most-once.

use std::future::Future;
use std::sync::{Arc, Mutex};

use async_nats::jetstream::{self, consumer::PullConsumer, AckKind};
use async_trait::async_trait;
use dashmap::DashMap;
use futures::StreamExt;
use relay_core::{EnvelopeHandler, InboundEnvelope, RelayError, Result, ThreadId};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::subjects::{SubjectScheme, DURABLE_NAME, STREAM_MAX_MESSAGES, STREAM_NAME};

/// How a bus message is settled once handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Accepted for handling; the outcome of delivery does not matter.
    Ack,
    /// Can never be handled; remove without redelivery.
    Term,
}

/// Settles a bus message. Implemented for JetStream messages; tests record dispositions.
#[async_trait]
pub trait Settle: Send + 'static {
    async fn settle(self: Box<Self>, disposition: Disposition);
}

#[async_trait]
impl Settle for jetstream::Message {
    async fn settle(self: Box<Self>, disposition: Disposition) {
        let result = match disposition {
            Disposition::Ack => self.ack().await,
            Disposition::Term => self.ack_with(AckKind::Term).await,
        };
        if let Err(e) = result {
            warn!(error = %e, disposition = ?disposition, "Failed to settle bus message");
        }
    }
}

/// Routes inbound payloads to per-thread workers: FIFO within a thread, parallel across threads.
pub struct InboundRouter {
    handler: Arc<dyn EnvelopeHandler>,
    // Unbounded; holds envelopes that are already acknowledged.
    workers: DashMap<ThreadId, mpsc::UnboundedSender<InboundEnvelope>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl InboundRouter {
    pub fn new(handler: Arc<dyn EnvelopeHandler>) -> Self {
        Self {
            handler,
            workers: DashMap::new(),
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Decodes `payload`, acknowledges it and queues it for its thread, or terminates it when
    /// malformed.
    pub async fn route(&self, payload: &[u8], settle: Box<dyn Settle>) {
        match InboundEnvelope::decode(payload) {
            Ok(envelope) => {
                debug!(
                    thread_id = %envelope.thread_id(),
                    text = ?envelope.text,
                    "Envelope received"
                );
                settle.settle(Disposition::Ack).await;
                self.dispatch(envelope);
            }
            Err(e) => {
                warn!(error = %e, len = payload.len(), "Dropping malformed envelope");
                settle.settle(Disposition::Term).await;
            }
        }
    }

    fn dispatch(&self, envelope: InboundEnvelope) {
        let thread = envelope.thread_id().clone();
        let sender = self
            .workers
            .entry(thread.clone())
            .or_insert_with(|| self.spawn_worker(&thread))
            .clone();

        if let Err(mpsc::error::SendError(envelope)) = sender.send(envelope) {
            // The worker is gone (it panicked); start a fresh one for this thread.
            warn!(thread_id = %thread, "Worker for thread exited, respawning");
            let sender = self.spawn_worker(&thread);
            self.workers.insert(thread, sender.clone());
            let _ = sender.send(envelope);
        }
    }

    fn spawn_worker(&self, thread: &ThreadId) -> mpsc::UnboundedSender<InboundEnvelope> {
        let (tx, mut rx) = mpsc::unbounded_channel::<InboundEnvelope>();
        let handler = self.handler.clone();
        let thread = thread.clone();

        let task = tokio::spawn(async move {
            debug!(thread_id = %thread, "Thread worker started");
            while let Some(envelope) = rx.recv().await {
                handler.handle_envelope(envelope).await;
            }
            debug!(thread_id = %thread, "Thread worker stopped");
        });

        if let Ok(mut tasks) = self.tasks.lock() {
            tasks.push(task);
        }
        tx
    }

    /// Number of threads with a live worker.
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Stops accepting work and waits until every queued message has been handled.
    pub async fn shutdown(&self) {
        self.workers.clear();
        let tasks = match self.tasks.lock() {
            Ok(mut tasks) => std::mem::take(&mut *tasks),
            Err(_) => Vec::new(),
        };
        for task in tasks {
            let _ = task.await;
        }
        info!("Inbound router drained");
    }
}

/// Creates the `tw` stream and the durable consumer for `scheme` when they do not exist yet.
#[instrument(skip(js))]
pub async fn ensure_consumer(js: &jetstream::Context, scheme: SubjectScheme) -> Result<PullConsumer> {
    let stream = js
        .get_or_create_stream(jetstream::stream::Config {
            name: STREAM_NAME.to_string(),
            subjects: SubjectScheme::stream_subjects(),
            max_messages: STREAM_MAX_MESSAGES,
            ..Default::default()
        })
        .await
        .map_err(|e| RelayError::Bus(format!("stream {}: {}", STREAM_NAME, e)))?;

    let consumer = stream
        .get_or_create_consumer(
            DURABLE_NAME,
            jetstream::consumer::pull::Config {
                durable_name: Some(DURABLE_NAME.to_string()),
                filter_subject: scheme.inbound_filter().to_string(),
                ..Default::default()
            },
        )
        .await
        .map_err(|e| RelayError::Bus(format!("consumer {}: {}", DURABLE_NAME, e)))?;

    info!(
        stream = STREAM_NAME,
        durable = DURABLE_NAME,
        filter = scheme.inbound_filter(),
        "nats js subscribe"
    );
    Ok(consumer)
}

/// Pulls messages until `shutdown` resolves, routing each one. The end of the message stream is
/// an error: nothing would reach the chat any more.
#[instrument(skip_all)]
pub async fn run_consumer<F>(consumer: PullConsumer, router: Arc<InboundRouter>, shutdown: F) -> Result<()>
where
    F: Future<Output = ()>,
{
    let mut messages = consumer
        .messages()
        .await
        .map_err(|e| RelayError::Bus(e.to_string()))?;
    tokio::pin!(shutdown);

    let result = loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Consumer shutting down");
                break Ok(());
            }
            next = messages.next() => match next {
                Some(Ok(message)) => {
                    let payload = message.payload.clone();
                    router.route(&payload, Box::new(message)).await;
                }
                Some(Err(e)) => warn!(error = %e, "Failed to pull bus message"),
                None => {
                    warn!("Bus message stream ended");
                    break Err(RelayError::Bus("message stream ended".to_string()));
                }
            }
        }
    };

    router.shutdown().await;
    result
}
