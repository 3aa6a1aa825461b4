//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Spendscope - Forecasts, anomalies and insights for your spending
#[derive(Parser)]
#[command(name = "spendscope")]
#[command(about = "Personal spending analytics over a transaction file", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Config file (defaults to <data dir>/spendscope/config.toml if present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Print JSON instead of human-readable output
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Forecast next month's total spend
    Forecast {
        /// Transaction file (.json or .csv)
        file: PathBuf,
    },

    /// Flag unusually large transactions
    Anomalies {
        /// Transaction file (.json or .csv)
        file: PathBuf,

        /// Standard deviations above the mean before flagging (overrides config)
        #[arg(short, long)]
        threshold: Option<f64>,
    },

    /// Generate spending insights
    Insights {
        /// Transaction file (.json or .csv)
        file: PathBuf,

        /// Add a summary line from Ollama (needs OLLAMA_HOST)
        #[arg(long)]
        llm: bool,
    },

    /// Categorize a single merchant
    Categorize {
        /// Merchant name
        #[arg(short, long)]
        merchant: String,

        /// Optional transaction title
        #[arg(short, long, default_value = "")]
        title: String,
    },

    /// Run the full analysis (categories, forecast, anomalies, insights)
    Analyze {
        /// Transaction file (.json or .csv)
        file: PathBuf,

        /// Add a summary line from Ollama (needs OLLAMA_HOST)
        #[arg(long)]
        llm: bool,
    },

    /// List the active category rules
    Rules,
}
