//! # relay-bot
//!
//! The `tw-relay` application: configuration, CLI, component wiring, and the run loop that
//! joins the NATS consumer, the aggregation engine, and Telegram polling.

pub mod cli;
pub mod components;
pub mod config;
pub mod forwarder;
pub mod runner;

pub use cli::{load_config, Cli, Commands};
pub use components::{build_components, RelayComponents};
pub use config::{ConfigSource, RelayConfig};
pub use forwarder::ChatForwarder;
pub use runner::run_relay;
