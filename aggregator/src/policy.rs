//! Coalescing policy: decides, per inbound chat line, whether the thread buffer only grows or
//! also has to be flushed.
//!
//! A run of identical lines is kept as one streak until the content changes or the streak hits
//! the repetition ceiling. The streak's hash only moves when a flush triggers.

use relay_core::defuse_mentions;
pub use relay_core::content_hash;

use crate::buffer::ThreadBuffer;

/// Default repetition ceiling.
pub const DEFAULT_REPETITION_THRESHOLD: usize = 100;

/// Why a flush was triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushReason {
    /// A different line arrived; everything buffered before it goes out.
    ContentChanged,
    /// The streak reached the repetition ceiling; the whole buffer goes out.
    Ceiling,
    /// The buffer sat idle long enough.
    Idle,
    /// A status poll ended; the roster goes out.
    RosterEnd,
}

/// Result of admitting one line into a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushDecision {
    /// Appended; nothing to send yet.
    Hold,
    /// Send the first `upto` bytes of the buffer.
    Flush { upto: usize, reason: FlushReason },
}

/// Renders a chat line as it appears in Telegram.
pub fn display_line(name: Option<&str>, text: &str) -> String {
    match name {
        Some(name) if !name.is_empty() => format!("{}: {}", defuse_mentions(name), text),
        _ => text.to_string(),
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CoalescingPolicy {
    repetition_threshold: usize,
}

impl Default for CoalescingPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_REPETITION_THRESHOLD)
    }
}

impl CoalescingPolicy {
    /// A threshold of 0 is treated as 1 (flush every line).
    pub fn new(repetition_threshold: usize) -> Self {
        Self {
            repetition_threshold: repetition_threshold.max(1),
        }
    }

    pub fn repetition_threshold(&self) -> usize {
        self.repetition_threshold
    }

    /// Appends `line` to `buffer` and decides what, if anything, must be flushed.
    ///
    /// The line is always appended. On a content change the flush covers only what was buffered
    /// before the line; on the ceiling it covers the whole buffer. A line landing in an empty
    /// buffer opens a new streak.
    pub fn admit(&self, buffer: &mut ThreadBuffer, line: &str) -> FlushDecision {
        let hash = content_hash(line);
        let before = buffer.text().len();

        let changed = buffer.last_content_hash.is_some_and(|h| h != hash) && before > 0;
        if changed || before == 0 {
            buffer.last_content_hash = Some(hash);
        }
        if changed {
            buffer.pending_count = 0;
        }

        buffer.push_line(line);

        if buffer.pending_count >= self.repetition_threshold {
            buffer.pending_count = 0;
            return FlushDecision::Flush {
                upto: buffer.text().len(),
                reason: FlushReason::Ceiling,
            };
        }

        if changed {
            return FlushDecision::Flush {
                upto: before,
                reason: FlushReason::ContentChanged,
            };
        }

        FlushDecision::Hold
    }
}
