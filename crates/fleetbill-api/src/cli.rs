//! Offline command line over the standalone billing path
//!
//! Each command opens its own connection to the database file, so the CLI
//! works without a running server.

use crate::config::ApiConfig;
use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use fleetbill_common::{TenantId, CARPOOL_BONUS};
use fleetbill_engine::{
    in_transaction, report, BillingService, Connector, SqliteConnector, SqliteStore,
};
use rust_decimal::Decimal;
use std::io::Write;
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Parser)]
#[command(
    name = "fleetbill-cli",
    about = "Price trips and maintain contracts in a Fleetbill database",
    version
)]
pub struct Cli {
    /// Database file (defaults to FLEETBILL_DATABASE_PATH)
    #[arg(long, global = true)]
    pub database: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Price one trip.
    Calculate {
        #[arg(long)]
        tenant: TenantId,
        #[arg(long)]
        trip: String,
        /// Override the stored carpool flag
        #[arg(long)]
        carpool: Option<bool>,
    },

    /// Show a tenant's active contract.
    Contract {
        #[arg(long)]
        tenant: TenantId,
    },

    /// Write a tenant's billing report as CSV.
    Report {
        #[arg(long)]
        tenant: TenantId,
        /// Output file (defaults to a timestamped name in the working directory)
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Add or update an incentive rule on a contract version.
    #[command(name = "set-incentive")]
    SetIncentive {
        #[arg(long)]
        version: String,
        #[arg(long, default_value = CARPOOL_BONUS)]
        name: String,
        #[arg(long)]
        amount: Decimal,
    },

    /// Create missing tables.
    Migrate,
}

/// Run a parsed command, writing its output to `out`
pub fn run(cli: Cli, config: &ApiConfig, out: &mut impl Write) -> anyhow::Result<()> {
    let path = cli.database.unwrap_or_else(|| config.database_path.clone());
    let connector = SqliteConnector::new(path, config.busy_timeout());
    let service = BillingService::new(config.engine());
    let billing = service.standalone(&connector);

    match cli.command {
        Commands::Calculate {
            tenant,
            trip,
            carpool,
        } => {
            let result = billing.calculate_trip_cost(&tenant, &trip, carpool)?;
            writeln!(out, "{}", serde_json::to_string_pretty(&result)?)?;
        }
        Commands::Contract { tenant } => {
            let contract = billing.get_active_contract(&tenant)?;
            writeln!(out, "{}", serde_json::to_string_pretty(&contract)?)?;
        }
        Commands::Report { tenant, out: file } => {
            let csv = billing.generate_client_report(&tenant)?;
            let file = file
                .unwrap_or_else(|| PathBuf::from(report::report_filename(&tenant, Utc::now())));
            std::fs::write(&file, &csv)
                .with_context(|| format!("Could not write report to {}", file.display()))?;
            info!(path = %file.display(), bytes = csv.len(), "Report written");
            writeln!(out, "{}", file.display())?;
        }
        Commands::SetIncentive {
            version,
            name,
            amount,
        } => {
            let mut store = connector.connect()?;
            let rules = in_transaction(&mut store, |store: &mut SqliteStore| {
                store.set_incentive_rule(&version, &name, amount)
            })?;
            writeln!(out, "{}", serde_json::to_string_pretty(&rules)?)?;
        }
        Commands::Migrate => {
            let store = connector.connect()?;
            store.migrate()?;
            writeln!(out, "Schema up to date: {}", connector.path().display())?;
        }
    }
    Ok(())
}
