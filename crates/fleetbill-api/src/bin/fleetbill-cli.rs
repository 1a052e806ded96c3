//! Fleetbill offline CLI

use clap::Parser;
use fleetbill_api::cli::{run, Cli};
use fleetbill_api::ApiConfig;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = ApiConfig::load()?;
    run(cli, &config, &mut std::io::stdout().lock())
}
