//! trustlink CLI - provisions a SAML federation between Microsoft Entra ID
//! and an AWS account.
//!
//! Configuration comes from the environment (a `.env` file is honored);
//! see `FederationConfig::from_env` for the variables.

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod error;

use error::CliResult;

/// trustlink - Entra ID to AWS federation provisioning
#[derive(Parser)]
#[command(name = "trustlink")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or refresh a federation; safe to re-run
    Ensure(commands::ensure::EnsureArgs),
}

#[tokio::main]
async fn main() {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,trustlink=debug")),
        )
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            e.print();
            std::process::exit(e.exit_code());
        }
    }
}

async fn run(cli: Cli) -> CliResult<()> {
    match cli.command {
        Commands::Ensure(args) => commands::ensure::execute(args).await,
    }
}
