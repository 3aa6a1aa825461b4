//! CLI command tests
//!
//! This module contains all tests for the CLI commands.

use std::io::Write;
use std::path::Path;

use chrono::{Months, NaiveDate};
use spendscope_core::{by_severity, AnalyticsConfig, BaselineKind, InsightKind, Severity};
use tempfile::{Builder, NamedTempFile};

use crate::commands::{self, truncate};

/// Six months of steady spending plus one large electronics purchase
fn write_history_csv() -> NamedTempFile {
    let mut file = Builder::new().suffix(".csv").tempfile().unwrap();
    writeln!(file, "id,title,amount,date,merchant,category").unwrap();

    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    for m in 0..6u32 {
        let first = start.checked_add_months(Months::new(m)).unwrap();
        writeln!(file, "rent-{m},Rent,900,{first},Landlord LLC,").unwrap();
        for (i, day) in [2u64, 9, 16, 23].iter().enumerate() {
            let date = first + chrono::Duration::days(*day as i64);
            writeln!(file, "cafe-{m}-{i},Coffee,{:.2},{date},Starbucks,", 4.5 + i as f64 * 0.25).unwrap();
        }
    }
    writeln!(file, "tv,Television,1899.99,2024-06-28,Starbucks,").unwrap();
    file
}

fn write_json(content: &str) -> NamedTempFile {
    let mut file = Builder::new().suffix(".json").tempfile().unwrap();
    write!(file, "{}", content).unwrap();
    file
}

// ========== Config Tests ==========

#[test]
fn test_load_config_explicit_file() {
    let mut file = Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(file, "[detection]\nthreshold_sigma = 4.0").unwrap();

    let config = commands::load_config(Some(file.path())).unwrap();
    assert_eq!(config.detection.threshold_sigma, 4.0);
}

#[test]
fn test_load_config_invalid_file() {
    let mut file = Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(file, "[forecast]\nmax_months = 1").unwrap();

    let err = commands::load_config(Some(file.path())).unwrap_err();
    assert!(format!("{:#}", err).contains("max_months"));
}

#[test]
fn test_load_config_missing_file() {
    assert!(commands::load_config(Some(Path::new("/nonexistent/config.toml"))).is_err());
}

// ========== Forecast Tests ==========

#[test]
fn test_cmd_forecast() {
    let file = write_history_csv();
    let config = AnalyticsConfig::default();

    assert!(commands::cmd_forecast(&config, file.path(), false).is_ok());
    assert!(commands::cmd_forecast(&config, file.path(), true).is_ok());
}

#[test]
fn test_run_forecast_linear_months() {
    let file = write_json(
        r#"[
            {"id": 1, "amount": 1000, "date": "2024-01-15", "merchant": "Rent"},
            {"id": 2, "amount": 1100, "date": "2024-02-15", "merchant": "Rent"},
            {"id": 3, "amount": 1200, "date": "2024-03-15", "merchant": "Rent"}
        ]"#,
    );
    let history = commands::load_transactions(file.path()).unwrap();
    let forecast = commands::run_forecast(&AnalyticsConfig::default(), &history).unwrap();

    assert!((forecast.forecast_amount - 1300.0).abs() < 1e-6);
    assert!(forecast.confidence_score > 0.9);
}

#[test]
fn test_cmd_forecast_missing_file() {
    let result = commands::cmd_forecast(
        &AnalyticsConfig::default(),
        Path::new("/nonexistent/history.csv"),
        false,
    );
    assert!(result.is_err());
}

#[test]
fn test_cmd_forecast_malformed_record() {
    let file = write_json(r#"[{"id": 1, "amount": "lots", "date": "2024-01-15", "merchant": "Rent"}]"#);
    let err = commands::cmd_forecast(&AnalyticsConfig::default(), file.path(), true).unwrap_err();
    assert!(format!("{:#}", err).contains("Unable to parse amount"));
}

// ========== Anomaly Tests ==========

#[test]
fn test_run_anomalies_flags_purchase() {
    let file = write_history_csv();
    let result = commands::run_anomalies(&AnalyticsConfig::default(), file.path(), None).unwrap();
    assert_eq!(result.ids(), vec!["tv"]);
}

#[test]
fn test_run_anomalies_threshold_override() {
    let file = write_history_csv();
    let result =
        commands::run_anomalies(&AnalyticsConfig::default(), file.path(), Some(1_000_000.0))
            .unwrap();
    assert!(result.is_empty());

    assert!(commands::run_anomalies(&AnalyticsConfig::default(), file.path(), Some(0.0)).is_err());
    assert!(commands::run_anomalies(&AnalyticsConfig::default(), file.path(), Some(-2.0)).is_err());
}

#[test]
fn test_cmd_anomalies() {
    let file = write_history_csv();
    let config = AnalyticsConfig::default();
    assert!(commands::cmd_anomalies(&config, file.path(), None, false).is_ok());
    assert!(commands::cmd_anomalies(&config, file.path(), None, true).is_ok());
    assert!(commands::cmd_anomalies(&config, file.path(), Some(1e9), false).is_ok());
}

// ========== Insight Tests ==========

#[tokio::test]
async fn test_run_insights_rules() {
    let file = write_history_csv();
    let insights = commands::run_insights(&AnalyticsConfig::default(), file.path(), false)
        .await
        .unwrap();

    assert!(insights
        .insights
        .iter()
        .any(|s| s.starts_with("Unusual charge of $1899.99 at Starbucks")));
}

#[tokio::test]
async fn test_run_findings_orders_by_severity() {
    let file = write_history_csv();
    let findings = commands::run_findings(&AnalyticsConfig::default(), file.path(), false)
        .await
        .unwrap();

    let anomaly = findings
        .iter()
        .find(|f| f.kind == InsightKind::Anomaly)
        .unwrap();
    assert_eq!(anomaly.severity, Severity::Warning);
    assert_eq!(by_severity(&findings)[0].severity, Severity::Warning);

    let insights = commands::run_insights(&AnalyticsConfig::default(), file.path(), false)
        .await
        .unwrap();
    let messages: Vec<&str> = findings.iter().map(|f| f.message.as_str()).collect();
    assert_eq!(insights.insights, messages);
}

#[test]
fn test_run_anomalies_uses_configured_categories() {
    // Every merchant is new, so only a category baseline can flag the print job
    let file = write_json(
        r#"[
            {"id": "a", "amount": 20, "date": "2024-01-02", "merchant": "Acme Paper"},
            {"id": "b", "amount": 22, "date": "2024-01-09", "merchant": "Acme Ink"},
            {"id": "c", "amount": 21, "date": "2024-01-16", "merchant": "Acme Pens"},
            {"id": "d", "amount": 19, "date": "2024-01-23", "merchant": "Acme Clips"},
            {"id": "big", "amount": 900, "date": "2024-01-30", "merchant": "Acme Print"}
        ]"#,
    );
    let config = AnalyticsConfig::parse(
        r#"
        [[categories.rules]]
        pattern = "acme"
        category = "Office"
        "#,
    )
    .unwrap();

    let result = commands::run_anomalies(&config, file.path(), None).unwrap();
    assert_eq!(result.ids(), vec!["big"]);
    assert_eq!(result.anomalies[0].baseline, BaselineKind::Category);

    let defaults = commands::run_anomalies(&AnalyticsConfig::default(), file.path(), None).unwrap();
    assert!(defaults.is_empty());
}

#[tokio::test]
async fn test_run_insights_empty_history() {
    let file = write_json(r#"{"transactions": []}"#);
    let insights = commands::run_insights(&AnalyticsConfig::default(), file.path(), false)
        .await
        .unwrap();
    assert_eq!(insights.insights.len(), 1);
}

#[tokio::test]
async fn test_cmd_insights_and_analyze() {
    let file = write_history_csv();
    let config = AnalyticsConfig::default();

    assert!(commands::cmd_insights(&config, file.path(), false, false).await.is_ok());
    assert!(commands::cmd_insights(&config, file.path(), false, true).await.is_ok());
    assert!(commands::cmd_analyze(&config, file.path(), false, false).await.is_ok());
    assert!(commands::cmd_analyze(&config, file.path(), false, true).await.is_ok());
}

#[tokio::test]
async fn test_run_analyze_report_shape() {
    let file = write_history_csv();
    let report = commands::run_analyze(&AnalyticsConfig::default(), file.path(), false)
        .await
        .unwrap();

    assert_eq!(report.categories.len(), 31);
    assert_eq!(report.anomalies.ids(), vec!["tv"]);

    let json = serde_json::to_value(&report).unwrap();
    assert!(json["forecast"]["forecast_amount"].is_number());
    assert!(json["forecast"]["confidence_score"].is_number());
    assert!(json["insights"]["insights"].is_array());
    assert_eq!(json["anomalies"]["anomalies"][0]["transaction_id"], "tv");
}

// ========== Categorize Tests ==========

#[test]
fn test_run_categorize() {
    let config = AnalyticsConfig::default();

    let response = commands::run_categorize(&config, "STARBUCKS #42", "").unwrap();
    assert_eq!(response.category, "Dining");

    let response = commands::run_categorize(&config, "Unknown Vendor", "").unwrap();
    assert_eq!(response.category, "uncategorized");

    let json = serde_json::to_string(&response).unwrap();
    assert_eq!(json, r#"{"category":"uncategorized"}"#);
}

#[test]
fn test_run_categorize_uses_configured_rules() {
    let config = AnalyticsConfig::parse(
        r#"
        [categories]
        uncategorized_label = "Misc"

        [[categories.rules]]
        pattern = "acme"
        category = "Office"
        "#,
    )
    .unwrap();

    assert_eq!(
        commands::run_categorize(&config, "ACME Supplies", "").unwrap().category,
        "Office"
    );
    assert_eq!(
        commands::run_categorize(&config, "Starbucks", "").unwrap().category,
        "Misc"
    );
}

#[test]
fn test_cmd_categorize_and_rules() {
    let config = AnalyticsConfig::default();
    assert!(commands::cmd_categorize(&config, "Netflix", "", false).is_ok());
    assert!(commands::cmd_categorize(&config, "Netflix", "", true).is_ok());
    assert!(commands::cmd_rules(&config, false).is_ok());
    assert!(commands::cmd_rules(&config, true).is_ok());
}

// ========== Utility Tests ==========

#[test]
fn test_truncate() {
    assert_eq!(truncate("short", 10), "short");
    assert_eq!(truncate("a much longer merchant name", 10), "a much ...");
    assert_eq!(truncate("Café Crème", 20), "Café Crème");
}
