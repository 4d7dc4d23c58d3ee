//! Lyfe CLI: route and quote swaps over a pool snapshot

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use lyfe_app::commands::{join, quote, route};
use lyfe_core::{PoolId, SwapType};
use lyfe_router::SwapRequest;
use serde::Serialize;

#[derive(Parser)]
#[command(name = "lyfe")]
#[command(about = "Price and route swaps across Lyfe pools", long_about = None)]
#[command(version)]
struct Cli {
    /// Pool snapshot JSON file
    #[arg(short, long)]
    pools: PathBuf,

    /// Router configuration JSON file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Plan a swap: propose, quote, rank and split
    Route {
        /// Swap request JSON file
        #[arg(short, long)]
        request: PathBuf,
    },

    /// List the candidate paths for a request without quoting them
    Paths {
        #[arg(short, long)]
        request: PathBuf,
    },

    /// Quote a single pool pair
    Quote {
        #[arg(long)]
        pool: String,

        #[arg(long)]
        token_in: String,

        #[arg(long)]
        token_out: String,

        /// Decimal amount of the fixed side
        #[arg(long)]
        amount: String,

        /// Treat the amount as the output
        #[arg(long)]
        exact_out: bool,
    },

    /// Estimate share tokens for a proportional join
    Join {
        #[arg(long)]
        pool: String,

        /// Decimal amounts in pool token order, share token excluded
        #[arg(long, value_delimiter = ',')]
        amounts: Vec<String>,
    },
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let text = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{}", text);
    Ok(())
}

fn main() -> Result<()> {
    lyfe_app::init_tracing();
    let cli = Cli::parse();

    let dict = lyfe_app::load_pools(&cli.pools)?;
    let config = lyfe_app::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Route { request } => {
            let request: SwapRequest = lyfe_app::load_json(&request)?;
            print_json(&route::route(&dict, &request, &config)?, cli.pretty)
        }
        Commands::Paths { request } => {
            let request: SwapRequest = lyfe_app::load_json(&request)?;
            print_json(&route::candidate_paths(&dict, &request, &config)?, cli.pretty)
        }
        Commands::Quote {
            pool,
            token_in,
            token_out,
            amount,
            exact_out,
        } => {
            let swap_type = if exact_out {
                SwapType::ExactOut
            } else {
                SwapType::ExactIn
            };
            let quote =
                quote::quote_pair(&dict, &PoolId::new(pool), &token_in, &token_out, swap_type, &amount)?;
            print_json(&quote, cli.pretty)
        }
        Commands::Join { pool, amounts } => {
            print_json(&join::estimate_join(&dict, &PoolId::new(pool), &amounts)?, cli.pretty)
        }
    }
}
