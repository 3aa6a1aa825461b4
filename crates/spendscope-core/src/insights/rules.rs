//! Deterministic, template-driven insights
//!
//! Rules run in a fixed order so identical input always yields identical
//! output:
//!
//! 1. Empty history: a single getting-started message, nothing else
//! 2. Forecast trend versus the latest month (or "not enough history")
//! 3. Low forecast confidence
//! 4. One message per anomaly, in history order
//! 5. Largest month-over-month category change
//! 6. Highest spending day of the week
//! 7. Encouragement when nothing is unusual and spend is flat or falling
//! 8. A generic message if no other rule fired

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{Datelike, Weekday};
use serde::{Deserialize, Serialize};

use crate::categorize::Categorizer;
use crate::error::Result;
use crate::forecast::{monthly_totals, MonthlyTotal};
use crate::models::{AnomalyResult, ForecastResult, InsightResult, TransactionHistory};

use super::strategy::{InsightInput, InsightStrategy};
use super::types::{Finding, InsightKind, Severity};

pub const EMPTY_HISTORY_MESSAGE: &str =
    "No transactions yet. Add a few expenses to start seeing insights.";

/// Insight rule thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InsightConfig {
    /// Forecast change versus the latest month that counts as a trend
    pub trend_threshold_percent: f64,
    /// Month-over-month category change worth mentioning
    pub category_change_percent: f64,
    /// Forecast confidence below which the estimate is called rough
    pub low_confidence: f64,
    /// Transactions needed before naming a top spending weekday
    pub weekday_min_transactions: usize,
}

impl Default for InsightConfig {
    fn default() -> Self {
        Self {
            trend_threshold_percent: 10.0,
            category_change_percent: 20.0,
            low_confidence: 0.5,
            weekday_min_transactions: 7,
        }
    }
}

/// Rule-based insight generator
#[derive(Debug, Clone, Default)]
pub struct RuleBasedInsights {
    config: InsightConfig,
    categorizer: Categorizer,
}

impl RuleBasedInsights {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: InsightConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Use `categorizer` for transactions that arrive without a category
    pub fn with_categorizer(mut self, categorizer: Categorizer) -> Self {
        self.categorizer = categorizer;
        self
    }

    pub fn config(&self) -> &InsightConfig {
        &self.config
    }

    /// Insight strings for a forecast, its anomalies and the history behind them
    pub fn generate(
        &self,
        forecast: &ForecastResult,
        anomalies: &AnomalyResult,
        history: &TransactionHistory,
    ) -> InsightResult {
        self.findings(forecast, anomalies, history).into()
    }

    /// Same as [`generate`](Self::generate) but keeps kind and severity
    pub fn findings(
        &self,
        forecast: &ForecastResult,
        anomalies: &AnomalyResult,
        history: &TransactionHistory,
    ) -> Vec<Finding> {
        if history.is_empty() {
            return vec![Finding::new(
                InsightKind::GettingStarted,
                Severity::Info,
                EMPTY_HISTORY_MESSAGE,
            )];
        }

        let totals = monthly_totals(history);
        let active_months = totals.iter().filter(|m| m.transactions > 0).count();
        let latest = totals.last().map(|m| m.total).unwrap_or(0.0);
        let trend = if active_months >= 2 && latest > 0.0 {
            Some((forecast.forecast_amount - latest) / latest * 100.0)
        } else {
            None
        };

        let mut findings = Vec::new();

        // 2. Trend
        if active_months < 2 {
            findings.push(Finding::new(
                InsightKind::Trend,
                Severity::Info,
                format!(
                    "Not enough monthly history to spot a trend yet. Next month's estimate is ${:.2}.",
                    forecast.forecast_amount
                ),
            ));
        } else if let Some(percent) = trend {
            if percent > self.config.trend_threshold_percent {
                findings.push(Finding::new(
                    InsightKind::Trend,
                    Severity::Warning,
                    format!(
                        "Spending is forecast to rise {:.0}% next month, from ${:.2} to ${:.2}.",
                        percent, latest, forecast.forecast_amount
                    ),
                ));
            } else if percent < -self.config.trend_threshold_percent {
                findings.push(Finding::new(
                    InsightKind::Trend,
                    Severity::Info,
                    format!(
                        "Spending is forecast to fall {:.0}% next month, to ${:.2}.",
                        percent.abs(),
                        forecast.forecast_amount
                    ),
                ));
            }
        }

        // 3. Confidence
        if active_months >= 2 && forecast.confidence_score < self.config.low_confidence {
            findings.push(Finding::new(
                InsightKind::Confidence,
                Severity::Attention,
                format!(
                    "Your monthly spending has been irregular, so next month's ${:.2} estimate is rough (confidence {:.2}).",
                    forecast.forecast_amount, forecast.confidence_score
                ),
            ));
        }

        // 4. Anomalies
        for anomaly in &anomalies.anomalies {
            findings.push(Finding::new(
                InsightKind::Anomaly,
                Severity::Warning,
                format!(
                    "Unusual charge of ${:.2} at {} on {}: {}.",
                    anomaly.amount,
                    anomaly.merchant,
                    anomaly.date.format("%b %-d, %Y"),
                    anomaly.reason
                ),
            ));
        }

        // 5. Category change
        if let Some(finding) = self.category_change(history, &totals) {
            findings.push(finding);
        }

        // 6. Weekday
        if let Some(finding) = self.top_weekday(history) {
            findings.push(finding);
        }

        // 7. Encouragement
        let flat_or_falling = trend.map_or(true, |p| p <= self.config.trend_threshold_percent);
        if anomalies.is_empty() && active_months >= 2 && flat_or_falling {
            findings.push(Finding::new(
                InsightKind::Encouragement,
                Severity::Info,
                "No unusual charges and your spending is holding steady. Keep it up!",
            ));
        }

        // 8. Fallback
        if findings.is_empty() {
            findings.push(Finding::new(
                InsightKind::Encouragement,
                Severity::Info,
                "Your spending looks consistent with your history.",
            ));
        }

        findings
    }

    /// Largest category change between the last two calendar months
    fn category_change(
        &self,
        history: &TransactionHistory,
        totals: &[MonthlyTotal],
    ) -> Option<Finding> {
        let [.., previous, current] = totals else {
            return None;
        };

        let mut by_category: BTreeMap<&str, (f64, f64)> = BTreeMap::new();
        for tx in history {
            let Some(category) = self.categorizer.group_label(tx) else {
                continue;
            };
            let (year, month) = (tx.date.year(), tx.date.month());
            if (year, month) == (current.year, current.month) {
                by_category.entry(category).or_default().1 += tx.amount;
            } else if (year, month) == (previous.year, previous.month) {
                by_category.entry(category).or_default().0 += tx.amount;
            }
        }

        let mut best: Option<(&str, f64)> = None;
        for (category, (before, now)) in &by_category {
            if *before <= 0.0 {
                continue;
            }
            let percent = (now - before) / before * 100.0;
            if percent.abs() < self.config.category_change_percent {
                continue;
            }
            if best.map_or(true, |(_, p)| percent.abs() > p.abs()) {
                best = Some((*category, percent));
            }
        }

        best.map(|(category, percent)| {
            if percent > 0.0 {
                Finding::new(
                    InsightKind::CategoryChange,
                    Severity::Attention,
                    format!(
                        "You spent {:.0}% more on {} this month compared to last month.",
                        percent, category
                    ),
                )
            } else {
                Finding::new(
                    InsightKind::CategoryChange,
                    Severity::Info,
                    format!(
                        "You spent {:.0}% less on {} this month compared to last month.",
                        percent.abs(),
                        category
                    ),
                )
            }
        })
    }

    fn top_weekday(&self, history: &TransactionHistory) -> Option<Finding> {
        if history.len() < self.config.weekday_min_transactions {
            return None;
        }

        let mut totals = [0.0f64; 7];
        for tx in history {
            totals[tx.date.weekday().num_days_from_monday() as usize] += tx.amount;
        }

        // Earlier weekday wins ties
        let mut best = 0;
        for (i, total) in totals.iter().enumerate() {
            if *total > totals[best] {
                best = i;
            }
        }
        if totals[best] <= 0.0 {
            return None;
        }

        Some(Finding::new(
            InsightKind::Weekday,
            Severity::Info,
            format!(
                "Your highest spending day is usually {}.",
                weekday_name(WEEKDAYS[best])
            ),
        ))
    }
}

const WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

#[async_trait]
impl InsightStrategy for RuleBasedInsights {
    fn name(&self) -> &'static str {
        "rules"
    }

    async fn findings(&self, input: &InsightInput<'_>) -> Result<Vec<Finding>> {
        Ok(RuleBasedInsights::findings(
            self,
            input.forecast,
            input.anomalies,
            input.history,
        ))
    }
}
