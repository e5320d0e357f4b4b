//! Relay components: the aggregation engine, the inbound router over it, and the chat
//! forwarder. Built from config plus injected sinks and publisher so tests can substitute both.

use std::sync::Arc;

use aggregator::{Aggregator, CoalescingPolicy, Deliverer, SenderPool};
use anyhow::Result;
use bus::{CommandPublisher, InboundRouter};
use relay_core::{EnvelopeHandler, Sink};
use relay_telegram::CommandTranslator;
use tracing::{info, instrument};

use crate::config::RelayConfig;
use crate::forwarder::ChatForwarder;

#[derive(Clone)]
pub struct RelayComponents {
    pub aggregator: Arc<Aggregator>,
    pub router: Arc<InboundRouter>,
    pub forwarder: Arc<ChatForwarder>,
}

/// Wires the engine over `sinks` (one per bot token) and the forwarder over `publisher`.
#[instrument(skip_all)]
pub fn build_components(
    config: &RelayConfig,
    sinks: Vec<Arc<dyn Sink>>,
    publisher: Arc<dyn CommandPublisher>,
) -> Result<RelayComponents> {
    if sinks.is_empty() {
        anyhow::bail!("no Telegram senders configured");
    }
    let senders = sinks.len();

    let deliverer = Deliverer::new(SenderPool::new(sinks)).with_send_timeout(config.send_timeout());
    let aggregator = Arc::new(Aggregator::new(
        CoalescingPolicy::new(config.repetition),
        deliverer,
    ));
    let router = Arc::new(InboundRouter::new(
        aggregator.clone() as Arc<dyn EnvelopeHandler>,
    ));

    let translator = CommandTranslator::new(config.templates(), config.custom_commands());
    let forwarder = Arc::new(ChatForwarder::new(translator, publisher));

    info!(
        senders,
        repetition = config.repetition,
        send_timeout = ?config.send_timeout(),
        "Relay components built"
    );

    Ok(RelayComponents {
        aggregator,
        router,
        forwarder,
    })
}
