pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

#[derive(Parser)]
#[command(name = "contentctl")]
#[command(about = "Content API operations: tenant backfill, dev tokens, store health")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in human-readable text format")]
    pub text: bool,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Run the legacy tenant backfill against DATABASE_URL")]
    Backfill,

    #[command(about = "Mint a bearer token signed with the configured secret")]
    Token(commands::token::TokenArgs),

    #[command(about = "Check that the document store is reachable")]
    Health,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);

    match cli.command {
        Commands::Backfill => commands::backfill::handle(output_format).await,
        Commands::Token(args) => commands::token::handle(args, output_format),
        Commands::Health => commands::health::handle(output_format).await,
    }
}
