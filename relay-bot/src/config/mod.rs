//! Relay configuration: one flat [`RelayConfig`] from YAML or environment.

mod base;

#[cfg(test)]
mod tests;

pub use base::{
    parse_token_list, ConfigSource, RelayConfig, DEFAULT_CONFIG_FILE, DEFAULT_NATS_SERVER,
    DEFAULT_SEND_TIMEOUT_SECS,
};
