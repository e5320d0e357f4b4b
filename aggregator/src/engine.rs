//! The aggregation engine: routes decoded envelopes into per-thread buffers, applies the
//! coalescing policy, and drives delivery.
//!
//! A thread's buffer lock is held from the flush decision until the delivered bytes are drained,
//! so appends for the same thread wait while other threads carry on.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use relay_core::{DecodeError, EnvelopeHandler, InboundEnvelope, InboundEvent, SinkError, ThreadId};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::buffer::{BufferStore, ThreadBuffer};
use crate::delivery::{Deliverer, DeliveryReport};
use crate::policy::{display_line, CoalescingPolicy, FlushDecision, FlushReason};
use crate::status::render_roster;

/// What handling one envelope did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The line was buffered; nothing was sent.
    Held,
    /// A player was added to the roster.
    RosterCollected,
    /// A flush went out completely.
    Delivered { reason: FlushReason, chunks: usize },
    /// A flush failed part-way; the undelivered part stays buffered.
    Retained {
        reason: FlushReason,
        chunks: usize,
        error: SinkError,
    },
    /// The sink can never accept this thread's text; the undelivered part was discarded.
    Dropped {
        reason: FlushReason,
        chunks: usize,
        error: SinkError,
    },
}

impl Outcome {
    fn from_report(reason: FlushReason, report: DeliveryReport) -> Self {
        let chunks = report.chunks_sent;
        match report.error {
            None => Outcome::Delivered { reason, chunks },
            Some(error) if error.is_fatal() => Outcome::Dropped {
                reason,
                chunks,
                error,
            },
            Some(error) => Outcome::Retained {
                reason,
                chunks,
                error,
            },
        }
    }
}

pub struct Aggregator {
    store: BufferStore,
    policy: CoalescingPolicy,
    deliverer: Deliverer,
}

impl Aggregator {
    pub fn new(policy: CoalescingPolicy, deliverer: Deliverer) -> Self {
        Self {
            store: BufferStore::new(),
            policy,
            deliverer,
        }
    }

    /// Copy of a thread's buffer, if the thread has been seen.
    pub async fn snapshot(&self, thread: &ThreadId) -> Option<ThreadBuffer> {
        let handle = self.store.get(thread)?;
        let buffer = handle.lock().await;
        Some(buffer.clone())
    }

    /// Handles one envelope for its thread.
    #[instrument(skip(self, envelope), fields(thread_id = %envelope.thread_id()))]
    pub async fn handle(&self, envelope: &InboundEnvelope) -> Result<Outcome, DecodeError> {
        let event = envelope.event()?;
        let thread = envelope.thread_id();
        let handle = self.store.entry(thread);
        let mut buffer = handle.lock().await;

        match event {
            InboundEvent::RosterEntry(name) => {
                buffer.add_to_roster(name);
                Ok(Outcome::RosterCollected)
            }
            InboundEvent::RosterEnd => {
                let roster = render_roster(buffer.roster());
                let report = self.deliverer.deliver_payload(thread, &roster).await;
                if report.is_complete() || report.is_fatal() {
                    buffer.clear_roster();
                }
                Ok(Outcome::from_report(FlushReason::RosterEnd, report))
            }
            InboundEvent::Line { name, text } => {
                let line = display_line(name, text);
                match self.policy.admit(&mut buffer, &line) {
                    FlushDecision::Hold => Ok(Outcome::Held),
                    FlushDecision::Flush { upto, reason } => {
                        Ok(self.flush(thread, &mut buffer, upto, reason).await)
                    }
                }
            }
        }
    }

    /// Sends the first `upto` bytes of `buffer` and drains whatever the sink accepted. After a
    /// fatal error the whole `upto` prefix is drained.
    async fn flush(
        &self,
        thread: &ThreadId,
        buffer: &mut ThreadBuffer,
        upto: usize,
        reason: FlushReason,
    ) -> Outcome {
        let payload = buffer.text()[..upto].to_string();
        let report = self.deliverer.deliver_payload(thread, &payload).await;
        if report.is_fatal() {
            warn!(
                thread_id = %thread,
                dropped_bytes = upto - report.delivered_bytes,
                "Sink rejects this thread, discarding undelivered text"
            );
            buffer.consume(upto);
        } else {
            buffer.consume(report.delivered_bytes);
        }
        debug!(
            thread_id = %thread,
            reason = ?reason,
            delivered_bytes = report.delivered_bytes,
            remaining = buffer.text().len(),
            "Flushed"
        );
        Outcome::from_report(reason, report)
    }

    /// Flushes every non-empty buffer untouched for at least `max_idle`. Threads that are busy
    /// right now are skipped until the next call. Returns how many flushes went out completely.
    pub async fn flush_idle(&self, max_idle: Duration) -> usize {
        let Some(cutoff) = Instant::now().checked_sub(max_idle) else {
            return 0;
        };

        let mut delivered = 0;
        for (thread, handle) in self.store.handles() {
            let Ok(mut buffer) = handle.try_lock() else {
                continue;
            };
            if buffer.text().is_empty() || !buffer.is_idle_since(cutoff) {
                continue;
            }
            let upto = buffer.text().len();
            match self.flush(&thread, &mut buffer, upto, FlushReason::Idle).await {
                Outcome::Delivered { .. } => {
                    buffer.pending_count = 0;
                    delivered += 1;
                }
                Outcome::Dropped { .. } => buffer.pending_count = 0,
                _ => {}
            }
        }
        delivered
    }

    /// Runs [`Aggregator::flush_idle`] every `max_idle` until the task is aborted.
    pub fn spawn_idle_flusher(self: Arc<Self>, max_idle: Duration) -> JoinHandle<()> {
        info!(interval_secs = max_idle.as_secs(), "Idle flusher started");
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(max_idle);
            loop {
                ticker.tick().await;
                let flushed = self.flush_idle(max_idle).await;
                if flushed > 0 {
                    debug!(flushed, "Idle buffers flushed");
                }
            }
        })
    }
}

#[async_trait]
impl EnvelopeHandler for Aggregator {
    async fn handle_envelope(&self, envelope: InboundEnvelope) {
        match self.handle(&envelope).await {
            Ok(outcome) => {
                debug!(thread_id = %envelope.thread_id(), outcome = ?outcome, "Envelope handled")
            }
            Err(e) => {
                warn!(thread_id = %envelope.thread_id(), error = %e, "Envelope rejected")
            }
        }
    }
}
