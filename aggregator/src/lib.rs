//! # aggregator
//!
//! Bus → Telegram direction of the relay. Inbound lines are accumulated per thread in a
//! [`BufferStore`], coalesced by the [`CoalescingPolicy`] (identical repeats are held until the
//! content changes or a repetition ceiling is reached), split to Telegram's size limits, and
//! delivered through a rotating [`SenderPool`]. Status polls build a roster in the same keyspace.

pub mod buffer;
pub mod delivery;
pub mod engine;
pub mod policy;
pub mod split;
pub mod status;

pub use buffer::{BufferHandle, BufferStore, ThreadBuffer};
pub use delivery::{Deliverer, DeliveryReport, SenderPool, DEFAULT_SEND_TIMEOUT};
pub use engine::{Aggregator, Outcome};
pub use policy::{
    content_hash, display_line, CoalescingPolicy, FlushDecision, FlushReason,
    DEFAULT_REPETITION_THRESHOLD,
};
pub use split::{split_chunks, split_payload, CHUNK_CHARS, SPLIT_THRESHOLD};
pub use status::{render_roster, ROSTER_PREFIX};
