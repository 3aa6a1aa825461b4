//! Analysis engine
//!
//! Runs categorization, forecasting and anomaly detection over one immutable
//! history. The three are independent, so they run on scoped threads and are
//! joined before any insight generation starts.

use std::thread;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::categorize::Categorizer;
use crate::config::AnalyticsConfig;
use crate::detect::AnomalyDetector;
use crate::error::{Error, Result};
use crate::forecast::Forecaster;
use crate::insights::{InsightConfig, InsightInput, InsightStrategy, RuleBasedInsights};
use crate::models::{
    AnomalyResult, CategoryAssignment, ForecastResult, InsightResult, TransactionHistory,
};

/// Joined output of the three analysis components
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub categories: Vec<CategoryAssignment>,
    pub forecast: ForecastResult,
    pub anomalies: AnomalyResult,
}

/// Analysis plus generated insights
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub categories: Vec<CategoryAssignment>,
    pub forecast: ForecastResult,
    pub anomalies: AnomalyResult,
    pub insights: InsightResult,
}

/// Categorizer, forecaster and detector built from one configuration
#[derive(Debug, Clone, Default)]
pub struct AnalysisEngine {
    categorizer: Categorizer,
    forecaster: Forecaster,
    detector: AnomalyDetector,
    insight_config: InsightConfig,
}

impl AnalysisEngine {
    pub fn new(categorizer: Categorizer, forecaster: Forecaster, detector: AnomalyDetector) -> Self {
        Self {
            categorizer,
            forecaster,
            detector,
            insight_config: InsightConfig::default(),
        }
    }

    pub fn from_config(config: &AnalyticsConfig) -> Result<Self> {
        config.validate()?;
        let categorizer = config.categories.categorizer()?;
        Ok(Self {
            detector: AnomalyDetector::with_config(config.detection.clone())
                .with_categorizer(categorizer.clone()),
            categorizer,
            forecaster: Forecaster::with_config(config.forecast.clone()),
            insight_config: config.insights.clone(),
        })
    }

    pub fn categorizer(&self) -> &Categorizer {
        &self.categorizer
    }

    pub fn forecaster(&self) -> &Forecaster {
        &self.forecaster
    }

    pub fn detector(&self) -> &AnomalyDetector {
        &self.detector
    }

    /// Rule-based insight generator using this engine's thresholds
    pub fn rule_insights(&self) -> RuleBasedInsights {
        RuleBasedInsights::with_config(self.insight_config.clone())
            .with_categorizer(self.categorizer.clone())
    }

    /// Run all three components concurrently and join
    pub fn analyze(&self, history: &TransactionHistory) -> Result<Analysis> {
        debug!(transactions = history.len(), "Starting analysis");

        let (categories, forecast, anomalies) = thread::scope(|s| {
            let categories = s.spawn(|| self.categorizer.assign_all(history));
            let forecast = s.spawn(|| self.forecaster.forecast(history));
            let anomalies = s.spawn(|| self.detector.detect(history));

            (
                categories.join().map_err(|_| worker_panicked("categorizer")),
                forecast.join().map_err(|_| worker_panicked("forecaster")),
                anomalies.join().map_err(|_| worker_panicked("anomaly detector")),
            )
        });

        let analysis = Analysis {
            categories: categories?,
            forecast: forecast??,
            anomalies: anomalies?,
        };

        info!(
            transactions = history.len(),
            forecast = analysis.forecast.forecast_amount,
            confidence = analysis.forecast.confidence_score,
            anomalies = analysis.anomalies.len(),
            "Analysis complete"
        );

        Ok(analysis)
    }

    /// Analyze, then generate insights with `strategy`
    pub async fn report(
        &self,
        history: &TransactionHistory,
        strategy: &dyn InsightStrategy,
    ) -> Result<Report> {
        let analysis = self.analyze(history)?;
        let insights = strategy
            .insights(&InsightInput::new(
                &analysis.forecast,
                &analysis.anomalies,
                history,
            ))
            .await?;

        debug!(strategy = strategy.name(), insights = insights.insights.len(), "Generated insights");

        Ok(Report {
            categories: analysis.categories,
            forecast: analysis.forecast,
            anomalies: analysis.anomalies,
            insights,
        })
    }
}

fn worker_panicked(worker: &str) -> Error {
    Error::Computation(format!("{} worker panicked", worker))
}
