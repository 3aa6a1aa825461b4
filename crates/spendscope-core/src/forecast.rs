//! Next-month spend forecasting
//!
//! Monthly totals are fitted with a least-squares line and extrapolated one
//! month ahead. Confidence is the fit's R², so a steady trend forecasts with
//! high confidence while erratic months push it toward zero.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::{ForecastResult, TransactionHistory};
use crate::stats::LinearFit;

/// Forecaster configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    /// Trailing months used for the trend fit
    pub max_months: usize,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self { max_months: 12 }
    }
}

/// Spend total for one calendar month
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MonthlyTotal {
    pub year: i32,
    pub month: u32,
    pub total: f64,
    pub transactions: usize,
}

impl MonthlyTotal {
    /// First day of the month
    pub fn start_date(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
    }

    /// "Jan 2024"
    pub fn label(&self) -> String {
        self.start_date()
            .map(|d| d.format("%b %Y").to_string())
            .unwrap_or_else(|| format!("{}-{:02}", self.year, self.month))
    }
}

fn month_index(date: NaiveDate) -> i64 {
    date.year() as i64 * 12 + date.month0() as i64
}

/// Per-month totals from the first to the last month of the history
///
/// Months without transactions between the two ends are included with a
/// zero total so the series has one point per calendar month.
pub fn monthly_totals(history: &TransactionHistory) -> Vec<MonthlyTotal> {
    let (first, last) = match (history.transactions().first(), history.last_date()) {
        (Some(first), Some(last)) => (month_index(first.date), month_index(last)),
        _ => return vec![],
    };

    let mut totals: Vec<MonthlyTotal> = (first..=last)
        .map(|idx| MonthlyTotal {
            year: idx.div_euclid(12) as i32,
            month: idx.rem_euclid(12) as u32 + 1,
            total: 0.0,
            transactions: 0,
        })
        .collect();

    for tx in history {
        let slot = &mut totals[(month_index(tx.date) - first) as usize];
        slot.total += tx.amount;
        slot.transactions += 1;
    }

    totals
}

/// Linear-trend forecaster
#[derive(Debug, Clone, Default)]
pub struct Forecaster {
    config: ForecastConfig,
}

impl Forecaster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ForecastConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ForecastConfig {
        &self.config
    }

    /// Forecast total spend for the month after the last month of history
    ///
    /// Fewer than two months with transactions yields the latest month's
    /// total with zero confidence. Only the trailing `max_months` are fitted.
    pub fn forecast(&self, history: &TransactionHistory) -> Result<ForecastResult> {
        let totals = monthly_totals(history);
        let window_start = totals.len().saturating_sub(self.config.max_months.max(1));
        let window = &totals[window_start..];

        let active_months = window.iter().filter(|m| m.transactions > 0).count();
        let latest = window.last().map(|m| m.total).unwrap_or(0.0);

        if active_months < 2 {
            if !latest.is_finite() {
                return Err(Error::Computation(format!(
                    "Non-finite monthly total: {}",
                    latest
                )));
            }
            debug!(
                months = active_months,
                latest, "Not enough monthly history for a trend"
            );
            return Ok(ForecastResult::flat(latest));
        }

        let values: Vec<f64> = window.iter().map(|m| m.total).collect();
        let fit = LinearFit::fit(&values)
            .ok_or_else(|| Error::Computation("Trend fit needs two months".to_string()))?;

        let predicted = fit.predict(values.len() as f64);
        if !predicted.is_finite() || !fit.r_squared.is_finite() {
            return Err(Error::Computation(format!(
                "Non-finite forecast from {} monthly totals",
                values.len()
            )));
        }

        debug!(
            months = values.len(),
            slope = fit.slope,
            r_squared = fit.r_squared,
            predicted,
            "Fitted monthly spend trend"
        );

        Ok(ForecastResult {
            forecast_amount: predicted.max(0.0),
            confidence_score: fit.r_squared.clamp(0.0, 1.0),
        })
    }
}
