//! Spendscope CLI - Personal spending analytics
//!
//! Usage:
//!   spendscope forecast FILE            Forecast next month's spend
//!   spendscope anomalies FILE           Flag unusual transactions
//!   spendscope insights FILE [--llm]    Human-readable insights
//!   spendscope categorize --merchant M  Categorize one merchant
//!   spendscope analyze FILE [--llm]     Everything at once

mod cli;
mod commands;

#[cfg(test)]
mod tests;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    // Logs go to stderr so --json output on stdout stays parseable
    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .compact()
                .with_writer(std::io::stderr),
        )
        .init();

    let config = commands::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Forecast { file } => commands::cmd_forecast(&config, &file, cli.json),
        Commands::Anomalies { file, threshold } => {
            commands::cmd_anomalies(&config, &file, threshold, cli.json)
        }
        Commands::Insights { file, llm } => {
            commands::cmd_insights(&config, &file, llm, cli.json).await
        }
        Commands::Categorize { merchant, title } => {
            commands::cmd_categorize(&config, &merchant, &title, cli.json)
        }
        Commands::Analyze { file, llm } => {
            commands::cmd_analyze(&config, &file, llm, cli.json).await
        }
        Commands::Rules => commands::cmd_rules(&config, cli.json),
    }
}
