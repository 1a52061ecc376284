#[macro_use]
extern crate tracing;

use clap::Parser;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

use xerosync::{
    MappingTable, Orchestrator, SettingsStore, StdinCodeProvider, SyncOptions, TokenManager,
    syncro, xero,
};

const CONFIG_PATH: &str = "config.json";
const MAPPING_PATH: &str = "product_mappings.csv";
const LOG_DIR: &str = "logs";

/// Sync unpaid Syncro invoices into Xero.
#[derive(Debug, Parser)]
#[command(name = "xerosync", version, about)]
struct Cli {
    /// Create invoices but never submit quick-pay payment records
    /// (testing mode).
    #[arg(long)]
    skip_payments: bool,
}

#[tokio::main]
async fn main() -> miette::Result<()> {
    let cli = Cli::parse();

    let file_appender = tracing_appender::rolling::daily(LOG_DIR, "xerosync.log");
    let (file_writer, _guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false),
        )
        .init();

    info!(skip_payments = cli.skip_payments, "starting sync run");

    // Configuration and mapping failures are fatal before any network
    // activity happens.
    let mut store = SettingsStore::load(CONFIG_PATH)?;
    let mapping = MappingTable::from_path(MAPPING_PATH)?;

    let access_token = TokenManager::new(&mut store, StdinCodeProvider)
        .ensure_valid_token()
        .await?;

    let source = syncro::Client::new(
        &store.settings.syncro.subdomain,
        store.settings.syncro.api_key.clone(),
    )?;
    let books = xero::Client::new(
        access_token,
        store.settings.xero.organization_id.clone(),
    )?;

    let orchestrator = Orchestrator::new(
        source,
        books,
        mapping,
        SyncOptions {
            skip_payments: cli.skip_payments,
        },
    );

    let counters = orchestrator.run().await?;

    println!("\nsync summary");
    println!("------------");
    println!("{counters}");

    Ok(())
}
