//! Buffer store: thread id → per-thread accumulation state.
//!
//! Each thread gets its own async mutex; the map itself is only touched long enough to clone the
//! handle, so two threads never wait on each other.

use std::sync::Arc;

use dashmap::DashMap;
use relay_core::ThreadId;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Accumulation state for one thread.
#[derive(Debug, Clone)]
pub struct ThreadBuffer {
    text: String,
    pub(crate) pending_count: usize,
    pub(crate) last_content_hash: Option<u64>,
    roster: Vec<String>,
    last_activity: Instant,
}

impl Default for ThreadBuffer {
    fn default() -> Self {
        Self {
            text: String::new(),
            pending_count: 0,
            last_content_hash: None,
            roster: Vec::new(),
            last_activity: Instant::now(),
        }
    }
}

impl ThreadBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lines waiting for delivery, each terminated by `\n`.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn pending_count(&self) -> usize {
        self.pending_count
    }

    pub fn last_content_hash(&self) -> Option<u64> {
        self.last_content_hash
    }

    pub fn roster(&self) -> &[String] {
        &self.roster
    }

    pub fn is_idle_since(&self, at: Instant) -> bool {
        self.last_activity <= at
    }

    pub(crate) fn push_line(&mut self, line: &str) {
        self.text.push_str(line);
        self.text.push('\n');
        self.pending_count += 1;
        self.touch();
    }

    /// Drops the first `bytes` bytes: the part of the buffer the sink accepted.
    pub(crate) fn consume(&mut self, bytes: usize) {
        let bytes = bytes.min(self.text.len());
        self.text.drain(..bytes);
    }

    pub(crate) fn add_to_roster(&mut self, name: &str) {
        if !self.roster.iter().any(|n| n == name) {
            self.roster.push(name.to_string());
        }
        self.touch();
    }

    pub(crate) fn clear_roster(&mut self) {
        self.roster.clear();
    }

    fn touch(&mut self) {
        self.last_activity = Instant::now();
    }
}

/// Shared handle to one thread's buffer.
pub type BufferHandle = Arc<Mutex<ThreadBuffer>>;

/// Owns every [`ThreadBuffer`]; buffers are created lazily and live for the process.
#[derive(Debug, Default)]
pub struct BufferStore {
    buffers: DashMap<ThreadId, BufferHandle>,
}

impl BufferStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the buffer for `thread`, creating it on first sight.
    pub fn entry(&self, thread: &ThreadId) -> BufferHandle {
        if let Some(handle) = self.buffers.get(thread) {
            return handle.clone();
        }
        self.buffers
            .entry(thread.clone())
            .or_insert_with(|| Arc::new(Mutex::new(ThreadBuffer::new())))
            .clone()
    }

    pub fn get(&self, thread: &ThreadId) -> Option<BufferHandle> {
        self.buffers.get(thread).map(|h| h.clone())
    }

    /// Snapshot of all known threads and their handles.
    pub fn handles(&self) -> Vec<(ThreadId, BufferHandle)> {
        self.buffers
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_entry_is_created_once() {
        let store = BufferStore::new();
        let a = store.entry(&ThreadId::Int(1));
        let b = store.entry(&ThreadId::Int(1));
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(store.len(), 1);
        assert!(store.get(&ThreadId::Int(2)).is_none());
    }

    #[test]
    fn test_push_and_consume() {
        let mut buf = ThreadBuffer::new();
        buf.push_line("a");
        buf.push_line("bb");
        assert_eq!(buf.text(), "a\nbb\n");
        assert_eq!(buf.pending_count(), 2);
        buf.consume(2);
        assert_eq!(buf.text(), "bb\n");
        buf.consume(100);
        assert_eq!(buf.text(), "");
    }

    #[test]
    fn test_roster_is_ordered_and_unique() {
        let mut buf = ThreadBuffer::new();
        buf.add_to_roster("b");
        buf.add_to_roster("a");
        buf.add_to_roster("b");
        assert_eq!(buf.roster(), &["b".to_string(), "a".to_string()]);
        buf.clear_roster();
        assert!(buf.roster().is_empty());
    }
}
