//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Shared utilities (config and transaction loading, JSON output)
//! - `analyze` - Forecast, anomaly, insight and full-analysis commands
//! - `categorize` - Single-merchant categorization and rule listing

pub mod analyze;
pub mod categorize;
pub mod core;

// Re-export command functions for main.rs
pub use analyze::*;
pub use categorize::*;
pub use core::*;

/// Truncate a string to a maximum length, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}
