//! Lockbox CLI entry point.
//!
//! Usage:
//!   lockbox migrate     - Create or upgrade the schema
//!   lockbox add-lock    - Register a lock
//!   lockbox issue       - Issue an access code
//!   lockbox revoke      - Revoke a code or a booking's codes
//!   lockbox lock|unlock - Remote door commands
//!   lockbox sync        - Refresh lock status from the provider
//!   lockbox codes       - List codes of a lock
//!   lockbox activity    - Show a lock's activity log
//!   lockbox sweep       - Expire lapsed codes and resync pending ones

use clap::Parser;
use lockbox_cli::{Cli, handler};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Load .env file (ignore if not found)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = handler::run(cli).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

/// Logs go to stderr so JSON output stays parseable.
fn init_logging(verbose: bool) {
    let default = if verbose { "lockbox=debug" } else { "lockbox=info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
