//! tw-relay binary. Loads `.env` before reading config so env-based config and RUST_LOG see it.

use anyhow::Result;
use clap::Parser;
use relay_bot::{load_config, run_relay, Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { token, config } => {
            let config = load_config(token, config)?;
            run_relay(config).await
        }
    }
}
