//! CLI parser and config loading.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::config::RelayConfig;

#[derive(Parser)]
#[command(name = "tw-relay")]
#[command(about = "Telegram <-> NATS relay for game servers", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the relay (config from ./config.yaml or env; token overrides TELEGRAM_BOT_TOKENS).
    Run {
        #[arg(short, long)]
        token: Option<String>,
        /// YAML config file; defaults to CONFIG_FILE or ./config.yaml
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

/// Loads RelayConfig from `config` when given, otherwise from the default locations.
pub fn load_config(token: Option<String>, config: Option<PathBuf>) -> Result<RelayConfig> {
    match config {
        Some(path) => {
            if !path.exists() {
                anyhow::bail!("config file not found: {}", path.display());
            }
            RelayConfig::load_from(&path, token)
        }
        None => RelayConfig::load(token),
    }
}
