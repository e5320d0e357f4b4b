//! # bus
//!
//! NATS JetStream side of the relay: the versioned subject scheme, the durable inbound
//! consumer with its per-thread router, and the outbound command publisher.

pub mod connect;
pub mod consumer;
pub mod publisher;
pub mod subjects;

pub use connect::{connect, NatsSettings};
pub use consumer::{ensure_consumer, run_consumer, Disposition, InboundRouter, Settle};
pub use publisher::{idempotency_key, CommandPublisher, NatsPublisher, OutboundCommand};
pub use subjects::{SubjectScheme, DURABLE_NAME, STREAM_NAME};
