//! Analysis command implementations

use std::path::Path;

use anyhow::{Context, Result};
use spendscope_core::{
    by_severity, monthly_totals, AnalysisEngine, AnalyticsConfig, AnomalyDetector,
    AnomalyResponse, AnomalyResult, Finding, ForecastResult, InsightInput, InsightKind,
    InsightResult, InsightStrategy, LlmInsights, OllamaClient, Report, Severity,
    TransactionHistory,
};
use tracing::{info, warn};

use super::core::{build_engine, load_transactions, print_json};
use super::truncate;

/// Insight strategy for a command: rule-based, or LLM-enhanced when asked for
/// and `OLLAMA_HOST` is set
pub fn insight_strategy(engine: &AnalysisEngine, llm: bool) -> Box<dyn InsightStrategy> {
    if !llm {
        return Box::new(engine.rule_insights());
    }

    match OllamaClient::from_env() {
        Some(client) => {
            info!(host = %client.host(), model = %client.model(), "Using Ollama for insights");
            Box::new(LlmInsights::new(engine.rule_insights(), client))
        }
        None => {
            warn!("--llm requested but OLLAMA_HOST is not set; using rule-based insights");
            Box::new(engine.rule_insights())
        }
    }
}

pub fn run_forecast(config: &AnalyticsConfig, history: &TransactionHistory) -> Result<ForecastResult> {
    build_engine(config)?
        .forecaster()
        .forecast(history)
        .context("Forecast failed")
}

pub fn run_anomalies(
    config: &AnalyticsConfig,
    file: &Path,
    threshold: Option<f64>,
) -> Result<AnomalyResult> {
    let history = load_transactions(file)?;

    let mut detection = config.detection.clone();
    if let Some(k) = threshold {
        if !k.is_finite() || k <= 0.0 {
            anyhow::bail!("--threshold must be a positive number, got {}", k);
        }
        detection.threshold_sigma = k;
    }

    let categorizer = config
        .categories
        .categorizer()
        .context("Invalid category rules")?;
    Ok(AnomalyDetector::with_config(detection)
        .with_categorizer(categorizer)
        .detect(&history))
}

/// Insight findings in rule order, with kind and severity
pub async fn run_findings(config: &AnalyticsConfig, file: &Path, llm: bool) -> Result<Vec<Finding>> {
    let history = load_transactions(file)?;
    let engine = build_engine(config)?;
    let analysis = engine.analyze(&history).context("Analysis failed")?;
    let strategy = insight_strategy(&engine, llm);

    strategy
        .findings(&InsightInput::new(
            &analysis.forecast,
            &analysis.anomalies,
            &history,
        ))
        .await
        .context("Insight generation failed")
}

pub async fn run_insights(config: &AnalyticsConfig, file: &Path, llm: bool) -> Result<InsightResult> {
    Ok(run_findings(config, file, llm).await?.into())
}

pub async fn run_analyze(config: &AnalyticsConfig, file: &Path, llm: bool) -> Result<Report> {
    let history = load_transactions(file)?;
    let engine = build_engine(config)?;
    let strategy = insight_strategy(&engine, llm);

    engine
        .report(&history, strategy.as_ref())
        .await
        .context("Analysis failed")
}

pub fn cmd_forecast(config: &AnalyticsConfig, file: &Path, json: bool) -> Result<()> {
    let history = load_transactions(file)?;
    let forecast = run_forecast(config, &history)?;

    if json {
        return print_json(&forecast);
    }

    let totals = monthly_totals(&history);

    println!("📈 Spending Forecast");
    println!("   ─────────────────────────────");
    for month in totals.iter().rev().take(6).rev() {
        println!("   {:<10} {:>12.2}", month.label(), month.total);
    }
    if !totals.is_empty() {
        println!("   ─────────────────────────────");
    }
    println!("   Next month:  ${:.2}", forecast.forecast_amount);
    println!("   Confidence:  {:.0}%", forecast.confidence_score * 100.0);

    if forecast.confidence_score == 0.0 {
        println!();
        println!("   💡 Tip: Two or more months of history are needed to spot a trend");
    }

    Ok(())
}

pub fn cmd_anomalies(
    config: &AnalyticsConfig,
    file: &Path,
    threshold: Option<f64>,
    json: bool,
) -> Result<()> {
    let result = run_anomalies(config, file, threshold)?;

    if json {
        return print_json(&AnomalyResponse::from(&result));
    }

    if result.is_empty() {
        println!("✅ No unusual transactions found.");
        return Ok(());
    }

    println!("⚠️  {} unusual transaction(s)", result.len());
    println!();
    println!(
        "   {:<12} {:<10} {:<24} {:>10}",
        "ID", "Date", "Merchant", "Amount"
    );
    println!("   {}", "─".repeat(60));
    for anomaly in &result.anomalies {
        println!(
            "   {:<12} {:<10} {:<24} {:>10.2}",
            truncate(&anomaly.transaction_id, 12),
            anomaly.date.to_string(),
            truncate(&anomaly.merchant, 24),
            anomaly.amount
        );
        println!("     {}", anomaly.reason);
    }

    Ok(())
}

pub async fn cmd_insights(config: &AnalyticsConfig, file: &Path, llm: bool, json: bool) -> Result<()> {
    let findings = run_findings(config, file, llm).await?;

    if json {
        return print_json(&InsightResult::from(findings));
    }

    println!("💡 Insights");
    println!("   ─────────────────────────────");
    for finding in by_severity(&findings) {
        println!("   {} {}", finding_icon(finding), finding.message);
    }

    Ok(())
}

fn finding_icon(finding: &Finding) -> &'static str {
    if finding.kind == InsightKind::Narrative {
        return "🤖";
    }
    match finding.severity {
        Severity::Warning => "⚠️ ",
        Severity::Attention => "👀",
        Severity::Info => "•",
    }
}

pub async fn cmd_analyze(config: &AnalyticsConfig, file: &Path, llm: bool, json: bool) -> Result<()> {
    let report = run_analyze(config, file, llm).await?;

    if json {
        return print_json(&report);
    }

    println!("📊 Analysis");
    println!("   ─────────────────────────────");
    println!("   Transactions:       {}", report.categories.len());
    println!(
        "   Next month:         ${:.2} ({:.0}% confidence)",
        report.forecast.forecast_amount,
        report.forecast.confidence_score * 100.0
    );
    println!("   Unusual charges:    {}", report.anomalies.len());

    let mut counts: Vec<(&str, usize)> = Vec::new();
    for assignment in &report.categories {
        match counts.iter_mut().find(|(c, _)| *c == assignment.category) {
            Some((_, n)) => *n += 1,
            None => counts.push((&assignment.category, 1)),
        }
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

    if !counts.is_empty() {
        println!();
        println!("🏷️  Categories");
        for (category, n) in &counts {
            println!("   {:<20} {:>5}", category, n);
        }
    }

    println!();
    println!("💡 Insights");
    for insight in &report.insights.insights {
        println!("   • {}", insight);
    }

    Ok(())
}
