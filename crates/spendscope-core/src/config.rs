//! Analytics configuration
//!
//! Loaded from TOML. Every section and field is optional; anything missing
//! falls back to the built-in defaults.
//!
//! Resolution order:
//!
//! 1. An explicit path (must exist)
//! 2. `<data_dir>/spendscope/config.toml` if present
//! 3. Built-in defaults
//!
//! ```toml
//! [detection]
//! threshold_sigma = 3.0
//!
//! [[categories.rules]]
//! pattern = "blue bottle|philz"
//! category = "Dining"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::categorize::{default_rules, CategoryRule, Categorizer, UNCATEGORIZED};
use crate::detect::DetectionConfig;
use crate::error::{Error, Result};
use crate::forecast::ForecastConfig;
use crate::insights::InsightConfig;

/// Category rule table and fallback label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryConfig {
    pub uncategorized_label: String,
    /// Ordered; the first matching rule wins
    pub rules: Vec<CategoryRule>,
}

impl Default for CategoryConfig {
    fn default() -> Self {
        Self {
            uncategorized_label: UNCATEGORIZED.to_string(),
            rules: default_rules(),
        }
    }
}

impl CategoryConfig {
    pub fn categorizer(&self) -> Result<Categorizer> {
        Categorizer::with_label(self.rules.clone(), &self.uncategorized_label)
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    pub forecast: ForecastConfig,
    pub detection: DetectionConfig,
    pub insights: InsightConfig,
    pub categories: CategoryConfig,
}

/// Default config override path
pub fn default_config_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("spendscope").join("config.toml"))
}

impl AnalyticsConfig {
    /// Load configuration (explicit path, then override file, then defaults)
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            if !path.exists() {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            return Self::from_file(path);
        }

        match default_config_path() {
            Some(default_path) if default_path.exists() => Self::from_file(&default_path),
            _ => {
                debug!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        let config = Self::parse(&content)?;
        debug!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    /// Parse and validate TOML content
    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let sigma = self.detection.threshold_sigma;
        if !sigma.is_finite() || sigma <= 0.0 {
            return Err(Error::Config(format!(
                "detection.threshold_sigma must be positive, got {}",
                sigma
            )));
        }
        if self.detection.min_observations < 1 {
            return Err(Error::Config(
                "detection.min_observations must be at least 1".to_string(),
            ));
        }
        if self.forecast.max_months < 2 {
            return Err(Error::Config(format!(
                "forecast.max_months must be at least 2, got {}",
                self.forecast.max_months
            )));
        }
        if self.categories.uncategorized_label.trim().is_empty() {
            return Err(Error::Config(
                "categories.uncategorized_label must not be empty".to_string(),
            ));
        }
        for (name, percent) in [
            ("insights.trend_threshold_percent", self.insights.trend_threshold_percent),
            ("insights.category_change_percent", self.insights.category_change_percent),
        ] {
            if !percent.is_finite() || percent < 0.0 {
                return Err(Error::Config(format!(
                    "{} must be zero or more, got {}",
                    name, percent
                )));
            }
        }
        let low = self.insights.low_confidence;
        if !(0.0..=1.0).contains(&low) {
            return Err(Error::Config(format!(
                "insights.low_confidence must be between 0 and 1, got {}",
                low
            )));
        }
        for (i, rule) in self.categories.rules.iter().enumerate() {
            if rule.pattern.trim().is_empty() || rule.category.trim().is_empty() {
                return Err(Error::Config(format!(
                    "categories.rules[{}] needs a pattern and a category",
                    i
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::categorize::PatternType;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_empty_toml_is_default() {
        let config = AnalyticsConfig::parse("").unwrap();
        assert_eq!(config, AnalyticsConfig::default());
        assert_eq!(config.detection.threshold_sigma, 2.5);
        assert_eq!(config.detection.min_observations, 3);
        assert_eq!(config.forecast.max_months, 12);
        assert!(!config.categories.rules.is_empty());
    }

    #[test]
    fn test_partial_sections_keep_defaults() {
        let config = AnalyticsConfig::parse(
            r#"
            [detection]
            threshold_sigma = 3.0

            [insights]
            trend_threshold_percent = 5.0
            "#,
        )
        .unwrap();

        assert_eq!(config.detection.threshold_sigma, 3.0);
        assert_eq!(config.detection.min_observations, 3);
        assert_eq!(config.insights.trend_threshold_percent, 5.0);
        assert_eq!(config.insights.low_confidence, 0.5);
    }

    #[test]
    fn test_custom_rules_replace_defaults() {
        let config = AnalyticsConfig::parse(
            r#"
            [categories]
            uncategorized_label = "Other"

            [[categories.rules]]
            pattern = "blue bottle|philz"
            category = "Dining"

            [[categories.rules]]
            pattern = "^uber\\b"
            category = "Transport"
            pattern_type = "regex"
            "#,
        )
        .unwrap();

        assert_eq!(config.categories.rules.len(), 2);
        assert_eq!(config.categories.rules[1].pattern_type, PatternType::Regex);

        let categorizer = config.categories.categorizer().unwrap();
        assert_eq!(categorizer.categorize("Philz Coffee", ""), "Dining");
        assert_eq!(categorizer.categorize("Uber Trip", ""), "Transport");
        assert_eq!(categorizer.categorize("Walmart", ""), "Other");
    }

    #[test]
    fn test_invalid_values_rejected() {
        for toml in [
            "[detection]\nthreshold_sigma = 0.0",
            "[detection]\nthreshold_sigma = -1.0",
            "[detection]\nmin_observations = 0",
            "[forecast]\nmax_months = 1",
            "[categories]\nuncategorized_label = \"  \"",
            "[[categories.rules]]\npattern = \"\"\ncategory = \"Dining\"",
            "[insights]\nlow_confidence = -0.1",
            "[insights]\nlow_confidence = 1.5",
            "[insights]\ntrend_threshold_percent = -5.0",
            "[insights]\ncategory_change_percent = -20.0",
        ] {
            let err = AnalyticsConfig::parse(toml).unwrap_err();
            assert!(matches!(err, Error::Config(_)), "{} -> {:?}", toml, err);
        }
    }

    #[test]
    fn test_example_config_parses() {
        let config =
            AnalyticsConfig::parse(include_str!("../../../config/spendscope.example.toml")).unwrap();
        let categorizer = config.categories.categorizer().unwrap();

        assert_eq!(categorizer.categorize("Monthly Rent", ""), "Housing");
        assert_eq!(categorizer.categorize("Florentine Restaurant", ""), "Dining");
        assert_eq!(categorizer.categorize("Current Electric Co", ""), "uncategorized");
    }

    #[test]
    fn test_malformed_toml_is_parse_error() {
        let err = AnalyticsConfig::parse("[detection\nthreshold_sigma = ").unwrap_err();
        assert!(matches!(err, Error::Toml(_)));
    }

    #[test]
    fn test_load_explicit_path() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[forecast]\nmax_months = 6").unwrap();

        let config = AnalyticsConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.forecast.max_months, 6);
    }

    #[test]
    fn test_load_missing_explicit_path_fails() {
        let err = AnalyticsConfig::load(Some(Path::new("/nonexistent/spendscope.toml"))).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
