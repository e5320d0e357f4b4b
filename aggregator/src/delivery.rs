//! Delivery to the rate-limited sink: a rotating [`SenderPool`] and the [`Deliverer`] that splits
//! payloads, bounds every send with a timeout, and reports how much of a payload landed.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use relay_core::{Sent, Sink, SinkError, ThreadId};
use tracing::{debug, error, instrument, warn};

use crate::split::split_payload;

/// Default per-send timeout.
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Round-robin pool of senders. Every call to [`SenderPool::next`] moves the cursor, so
/// concurrent deliveries never pick the same slot at the same time.
pub struct SenderPool {
    senders: Vec<Arc<dyn Sink>>,
    cursor: AtomicUsize,
}

impl SenderPool {
    pub fn new(senders: Vec<Arc<dyn Sink>>) -> Self {
        Self {
            senders,
            cursor: AtomicUsize::new(0),
        }
    }

    pub fn len(&self) -> usize {
        self.senders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.senders.is_empty()
    }

    /// Picks the next sender and its index in the pool.
    pub fn next(&self) -> Option<(usize, &Arc<dyn Sink>)> {
        if self.senders.is_empty() {
            return None;
        }
        let idx = self.cursor.fetch_add(1, Ordering::Relaxed) % self.senders.len();
        Some((idx, &self.senders[idx]))
    }
}

/// How much of a payload reached the sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Bytes of the payload, from its start, that were accepted.
    pub delivered_bytes: usize,
    pub chunks_sent: usize,
    /// The error that stopped delivery, if any.
    pub error: Option<SinkError>,
}

impl DeliveryReport {
    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }

    /// Delivery stopped on an error no retry can fix.
    pub fn is_fatal(&self) -> bool {
        self.error.as_ref().is_some_and(SinkError::is_fatal)
    }
}

pub struct Deliverer {
    pool: SenderPool,
    send_timeout: Option<Duration>,
}

impl Deliverer {
    pub fn new(pool: SenderPool) -> Self {
        Self {
            pool,
            send_timeout: Some(DEFAULT_SEND_TIMEOUT),
        }
    }

    /// Sets the per-send timeout; `None` waits for the sink indefinitely.
    pub fn with_send_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.send_timeout = timeout;
        self
    }

    /// Sends one unit of text with the next sender of the pool. Never retries.
    pub async fn deliver(&self, thread: &ThreadId, text: &str) -> Result<Sent, SinkError> {
        let (sender, sink) = self.pool.next().ok_or(SinkError::NoSenders)?;

        let send = sink.send_text(thread, text);
        let result = match self.send_timeout {
            Some(limit) => match tokio::time::timeout(limit, send).await {
                Ok(result) => result,
                Err(_) => Err(SinkError::Timeout(limit)),
            },
            None => send.await,
        };

        match result {
            Ok(()) => {
                debug!(thread_id = %thread, sender, len = text.len(), "Delivered");
                Ok(Sent { sender })
            }
            Err(e) => {
                log_send_failure(&e, thread, sender);
                Err(e)
            }
        }
    }

    /// Delivers `payload` split into chunks, in order, stopping at the first failure.
    #[instrument(skip(self, payload), fields(len = payload.len()))]
    pub async fn deliver_payload(&self, thread: &ThreadId, payload: &str) -> DeliveryReport {
        let mut report = DeliveryReport {
            delivered_bytes: 0,
            chunks_sent: 0,
            error: None,
        };

        for chunk in split_payload(payload) {
            // Telegram rejects blank text.
            if chunk.trim().is_empty() {
                report.delivered_bytes += chunk.len();
                continue;
            }
            match self.deliver(thread, chunk).await {
                Ok(_) => {
                    report.delivered_bytes += chunk.len();
                    report.chunks_sent += 1;
                }
                Err(e) => {
                    report.error = Some(e);
                    break;
                }
            }
        }

        report
    }
}

fn log_send_failure(err: &SinkError, thread: &ThreadId, sender: usize) {
    match err {
        SinkError::RateLimited { .. } | SinkError::Timeout(_) => {
            debug!(thread_id = %thread, sender, error = %err, "Send failed, keeping buffer");
        }
        SinkError::Fatal(_) | SinkError::NoSenders => {
            error!(thread_id = %thread, sender, error = %err, fatal = true, "Send failed permanently");
        }
        SinkError::Unknown(_) => {
            warn!(thread_id = %thread, sender, error = %err, "Send failed, keeping buffer");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct Recorder {
        idx: usize,
        log: Arc<Mutex<Vec<usize>>>,
    }

    #[async_trait]
    impl Sink for Recorder {
        async fn send_text(&self, _thread: &ThreadId, _text: &str) -> Result<(), SinkError> {
            self.log.lock().unwrap().push(self.idx);
            Ok(())
        }
    }

    struct Stalled;

    #[async_trait]
    impl Sink for Stalled {
        async fn send_text(&self, _thread: &ThreadId, _text: &str) -> Result<(), SinkError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(())
        }
    }

    fn recording_pool(n: usize) -> (SenderPool, Arc<Mutex<Vec<usize>>>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let senders = (0..n)
            .map(|idx| {
                Arc::new(Recorder {
                    idx,
                    log: log.clone(),
                }) as Arc<dyn Sink>
            })
            .collect();
        (SenderPool::new(senders), log)
    }

    #[tokio::test]
    async fn test_round_robin_over_three_senders() {
        let (pool, log) = recording_pool(3);
        let deliverer = Deliverer::new(pool);
        let thread = ThreadId::Int(1);
        let mut used = Vec::new();
        for _ in 0..5 {
            used.push(deliverer.deliver(&thread, "hi").await.unwrap().sender);
        }
        assert_eq!(used, vec![0, 1, 2, 0, 1]);
        assert_eq!(*log.lock().unwrap(), vec![0, 1, 2, 0, 1]);
    }

    #[tokio::test]
    async fn test_empty_pool() {
        let deliverer = Deliverer::new(SenderPool::new(Vec::new()));
        let err = deliverer.deliver(&ThreadId::Int(1), "hi").await.unwrap_err();
        assert_eq!(err, SinkError::NoSenders);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_counts_as_failure() {
        let deliverer = Deliverer::new(SenderPool::new(vec![Arc::new(Stalled) as Arc<dyn Sink>]))
            .with_send_timeout(Some(Duration::from_secs(2)));
        let err = deliverer.deliver(&ThreadId::Int(1), "hi").await.unwrap_err();
        assert_eq!(err, SinkError::Timeout(Duration::from_secs(2)));
    }

    #[tokio::test]
    async fn test_blank_chunks_are_skipped() {
        let (pool, log) = recording_pool(1);
        let deliverer = Deliverer::new(pool);
        let report = deliverer.deliver_payload(&ThreadId::Int(1), "\n").await;
        assert!(report.is_complete());
        assert_eq!(report.delivered_bytes, 1);
        assert_eq!(report.chunks_sent, 0);
        assert!(log.lock().unwrap().is_empty());
    }
}
