//! Pluggable insight generation

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{AnomalyResult, ForecastResult, InsightResult, TransactionHistory};

use super::types::Finding;

/// Everything an insight strategy may look at
#[derive(Debug, Clone, Copy)]
pub struct InsightInput<'a> {
    pub forecast: &'a ForecastResult,
    pub anomalies: &'a AnomalyResult,
    pub history: &'a TransactionHistory,
}

impl<'a> InsightInput<'a> {
    pub fn new(
        forecast: &'a ForecastResult,
        anomalies: &'a AnomalyResult,
        history: &'a TransactionHistory,
    ) -> Self {
        Self {
            forecast,
            anomalies,
            history,
        }
    }
}

/// Trait implemented by every insight generator
///
/// Implementations must not change the meaning of the forecast or the
/// anomaly list they are given; they only phrase it.
#[async_trait]
pub trait InsightStrategy: Send + Sync {
    /// Short identifier for logs and reports
    fn name(&self) -> &'static str;

    /// Produce ordered findings, keeping kind and severity
    async fn findings(&self, input: &InsightInput<'_>) -> Result<Vec<Finding>>;

    /// Produce ordered, human-readable insights
    async fn insights(&self, input: &InsightInput<'_>) -> Result<InsightResult> {
        Ok(self.findings(input).await?.into())
    }
}
