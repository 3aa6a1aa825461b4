//! Insight generation
//!
//! Turns a forecast and an anomaly list into short, human-readable
//! sentences. Generators implement [`InsightStrategy`]:
//!
//! - [`RuleBasedInsights`] - deterministic templates, the default
//! - [`LlmInsights`] - rule output plus one summary line from Ollama
//!
//! ## Usage
//!
//! ```rust,ignore
//! use spendscope_core::insights::{InsightInput, InsightStrategy, RuleBasedInsights};
//!
//! let rules = RuleBasedInsights::new();
//! let result = rules.insights(&InsightInput::new(&forecast, &anomalies, &history)).await?;
//! ```

pub mod llm;
pub mod rules;
pub mod strategy;
pub mod types;

pub use llm::LlmInsights;
pub use rules::{InsightConfig, RuleBasedInsights, EMPTY_HISTORY_MESSAGE};
pub use strategy::{InsightInput, InsightStrategy};
pub use types::{by_severity, Finding, InsightKind, Severity};
