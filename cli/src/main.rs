use anyhow::Result;
use clap::{Parser, Subcommand};
use near_treasury_lib::config::NetworkConfig;
use tracing_subscriber::EnvFilter;

mod commands;
mod rpc;

#[derive(Parser)]
#[command(name = "near-treasury")]
#[command(about = "Inspect NEAR multisig treasuries, pending requests, and lockups")]
struct Cli {
    /// Network to query: mainnet or testnet
    #[arg(long, default_value = "mainnet")]
    network: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List pending multisig requests with human explanations
    Requests {
        /// Multisig account to inspect
        account: String,
    },
    /// Show members and the confirmation threshold
    Members {
        /// Multisig account to inspect
        account: String,
    },
    /// Fetch and decode lockup contract state
    Lockup {
        /// Lockup account to inspect
        account: String,

        /// How to decode the staking pool id field: u128 or utf8
        #[arg(long, default_value = "u128")]
        pool_id_format: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = match cli.network.as_str() {
        "mainnet" => NetworkConfig::mainnet(),
        "testnet" => NetworkConfig::testnet(),
        other => anyhow::bail!("Unknown network: {}", other),
    };

    match cli.command {
        Commands::Requests { account } => commands::requests::run(&config, &account).await,
        Commands::Members { account } => commands::members::run(&config, &account).await,
        Commands::Lockup {
            account,
            pool_id_format,
        } => commands::lockup::run(&config, &account, &pool_id_format).await,
    }
}
