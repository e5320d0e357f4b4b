use std::sync::Arc;

use anyhow::{Context, Result};
use bus::{connect, ensure_consumer, run_consumer, CommandPublisher, NatsPublisher};
use relay_core::{init_tracing, ChatHandler};
use relay_telegram::run_repl;
use tokio::sync::oneshot;
use tokio::task::JoinError;
use tracing::{error, info, instrument};

use crate::components::build_components;
use crate::config::RelayConfig;

/// Main entry: validate config, init logging, connect to NATS, start the inbound consumer and
/// the idle flusher, then poll Telegram until Ctrl-C. On shutdown the consumer stops pulling and
/// per-thread workers drain what is already queued.
#[instrument(skip(config))]
pub async fn run_relay(config: RelayConfig) -> Result<()> {
    config.validate()?;
    init_tracing(&config.log_level, config.log_file.as_deref())?;

    let scheme = config.subject_scheme()?;
    let telegram = config.telegram();
    info!(
        source = ?config.source,
        bots = config.telegram_bot_tokens.len(),
        scheme = %scheme,
        nats = %config.nats_server,
        "Initializing relay"
    );

    let (_client, js) = connect(&config.nats())
        .await
        .context("Failed to connect to NATS")?;
    let consumer = ensure_consumer(&js, scheme)
        .await
        .context("Failed to set up the inbound consumer")?;
    let publisher: Arc<dyn CommandPublisher> = Arc::new(NatsPublisher::new(js, scheme));

    let components = build_components(&config, telegram.sinks(), publisher)?;

    let idle_flusher = config
        .idle_flush()
        .map(|max_idle| components.aggregator.clone().spawn_idle_flusher(max_idle));

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let mut consumer_task =
        tokio::spawn(run_consumer(consumer, components.router.clone(), async move {
            let _ = stop_rx.await;
        }));

    info!("Relay started successfully");

    let bot = telegram.polling_bot()?;
    let forwarder: Arc<dyn ChatHandler> = components.forwarder.clone();
    let consumer_exit = tokio::select! {
        result = run_repl(bot, forwarder, telegram.recipient()) => {
            if let Err(e) = result {
                error!(error = %e, "Telegram polling stopped");
            }
            None
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl-C received");
            None
        }
        joined = &mut consumer_task => Some(joined),
    };

    info!("Shutting down");
    let _ = stop_tx.send(());
    if let Some(task) = idle_flusher {
        task.abort();
    }

    match consumer_exit {
        Some(joined) => {
            let err = unexpected_consumer_exit(joined);
            error!(error = %err, "Inbound consumer stopped, exiting");
            Err(err)
        }
        None => {
            match consumer_task.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!(error = %e, "Inbound consumer failed"),
                Err(e) => error!(error = %e, "Inbound consumer task panicked"),
            }
            info!("Relay stopped");
            Ok(())
        }
    }
}

/// The consumer only returns on its own when the inbound direction is dead, so any exit it
/// makes before shutdown is an error.
fn unexpected_consumer_exit(
    joined: std::result::Result<relay_core::Result<()>, JoinError>,
) -> anyhow::Error {
    match joined {
        Ok(Ok(())) => anyhow::anyhow!("Inbound consumer stopped unexpectedly"),
        Ok(Err(e)) => anyhow::Error::new(e).context("Inbound consumer failed"),
        Err(e) => anyhow::anyhow!("Inbound consumer task panicked: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_core::RelayError;

    #[test]
    fn test_consumer_error_is_reported() {
        let err = unexpected_consumer_exit(Ok(Err(RelayError::Bus(
            "message stream ended".to_string(),
        ))));
        assert_eq!(err.to_string(), "Inbound consumer failed");
        assert!(format!("{:#}", err).contains("message stream ended"));
    }

    #[test]
    fn test_clean_consumer_return_is_still_an_error() {
        let err = unexpected_consumer_exit(Ok(Ok(())));
        assert!(err.to_string().contains("stopped unexpectedly"));
    }

    #[tokio::test]
    async fn test_consumer_panic_is_reported() {
        let joined = tokio::spawn(async { panic!("boom"); }).await;
        let joined = joined.map(|()| Ok(()));
        let err = unexpected_consumer_exit(joined);
        assert!(err.to_string().contains("panicked"));
    }
}
