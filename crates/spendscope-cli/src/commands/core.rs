//! Shared command utilities
//!
//! This module contains:
//! - `load_config` - Resolve and validate the analytics configuration
//! - `load_transactions` - Read a transaction file into a validated history
//! - `build_engine` - Analysis engine from configuration
//! - `print_json` - Pretty JSON to stdout

use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use spendscope_core::{load_history, AnalysisEngine, AnalyticsConfig, TransactionHistory};

/// Load configuration from an explicit path, the data-dir override, or defaults
pub fn load_config(path: Option<&Path>) -> Result<AnalyticsConfig> {
    match path {
        Some(p) => AnalyticsConfig::load(Some(p))
            .with_context(|| format!("Failed to load config from {}", p.display())),
        None => AnalyticsConfig::load(None).context("Failed to load config"),
    }
}

/// Load a transaction file (format chosen by extension)
pub fn load_transactions(file: &Path) -> Result<TransactionHistory> {
    load_history(file).with_context(|| format!("Failed to load transactions from {}", file.display()))
}

pub fn build_engine(config: &AnalyticsConfig) -> Result<AnalysisEngine> {
    AnalysisEngine::from_config(config).context("Invalid analytics configuration")
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("Failed to serialize output")?
    );
    Ok(())
}
