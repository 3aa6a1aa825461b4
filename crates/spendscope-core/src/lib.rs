//! Spendscope Core Library
//!
//! Personal spending analytics over one account's transaction history:
//! - Rule-based merchant categorization
//! - Next-month spend forecasting with a confidence score
//! - Statistical anomaly detection per merchant and category
//! - Pluggable insight generation (templates, optional local LLM)
//! - JSON/CSV transaction loading and TOML configuration

pub mod ai;
pub mod categorize;
pub mod config;
pub mod detect;
pub mod engine;
pub mod error;
pub mod forecast;
pub mod import;
pub mod insights;
pub mod models;
pub mod stats;

/// Test utilities including mock Ollama server
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use ai::OllamaClient;
pub use categorize::{default_rules, CategoryRule, Categorizer, PatternType, UNCATEGORIZED};
pub use config::{AnalyticsConfig, CategoryConfig};
pub use detect::{AnomalyDetector, DetectionConfig};
pub use engine::{Analysis, AnalysisEngine, Report};
pub use error::{Error, Result};
pub use forecast::{monthly_totals, ForecastConfig, Forecaster, MonthlyTotal};
pub use import::{load_history, parse_csv, parse_json};
pub use insights::{
    by_severity, Finding, InsightConfig, InsightInput, InsightKind, InsightStrategy, LlmInsights,
    RuleBasedInsights, Severity,
};
pub use models::{
    Anomaly, AnomalyResponse, AnomalyResult, BaselineKind, CategoryAssignment, CategoryResponse,
    CategorySource, ForecastResult, InsightResult, Transaction, TransactionHistory,
};
