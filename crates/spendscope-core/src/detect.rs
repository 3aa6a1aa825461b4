//! Spending anomaly detection
//!
//! The history is walked in date order while a running baseline is kept for
//! every merchant and category. Each transaction is compared with the
//! baseline of the transactions before it at the same merchant; merchants
//! with too few prior observations fall back to the transaction's category.
//! A transaction is anomalous when its amount is more than `threshold_sigma`
//! standard deviations above that baseline's mean, and the baseline has at
//! least `min_observations` points.
//!
//! Transactions without a category label are grouped under the category
//! their merchant or title maps to in the rule table.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::categorize::Categorizer;
use crate::models::{Anomaly, AnomalyResult, BaselineKind, Transaction, TransactionHistory};
use crate::stats::Baseline;

/// Detection configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Standard deviations above the mean before a charge is flagged
    pub threshold_sigma: f64,
    /// Minimum prior observations a group needs before it can flag anything
    pub min_observations: usize,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            threshold_sigma: 2.5,
            min_observations: 3,
        }
    }
}

/// Merchant name normalization for grouping
///
/// Case, surrounding whitespace and repeated inner whitespace are ignored so
/// "Coffee Co" and "COFFEE  CO " share a baseline.
pub fn normalize_merchant(merchant: &str) -> String {
    merchant
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Group keys and display label for one transaction
struct Groups<'a> {
    merchant: String,
    category: Option<(String, &'a str)>,
}

/// Statistical anomaly detector
#[derive(Debug, Clone, Default)]
pub struct AnomalyDetector {
    config: DetectionConfig,
    categorizer: Categorizer,
}

impl AnomalyDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: DetectionConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Use `categorizer` to place unlabeled transactions in a category group
    pub fn with_categorizer(mut self, categorizer: Categorizer) -> Self {
        self.categorizer = categorizer;
        self
    }

    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    /// Flag transactions far above their group's typical amount
    pub fn detect(&self, history: &TransactionHistory) -> AnomalyResult {
        if history.is_empty() {
            return AnomalyResult::default();
        }

        let mut merchants: HashMap<String, Baseline> = HashMap::new();
        let mut categories: HashMap<String, Baseline> = HashMap::new();
        let mut anomalies = Vec::new();

        // History is sorted by date, so each baseline only holds earlier points
        for tx in history {
            let groups = self.groups(tx);

            let merchant_prior = merchants.get(&groups.merchant).copied().unwrap_or_default();
            let category_prior = groups
                .category
                .as_ref()
                .and_then(|(key, _)| categories.get(key).copied());

            if let Some(anomaly) = self.evaluate(tx, &groups, merchant_prior, category_prior) {
                anomalies.push(anomaly);
            }

            if !groups.merchant.is_empty() {
                merchants.entry(groups.merchant).or_default().push(tx.amount);
            }
            if let Some((key, _)) = groups.category {
                categories.entry(key).or_default().push(tx.amount);
            }
        }

        info!(
            transactions = history.len(),
            merchants = merchants.len(),
            anomalies = anomalies.len(),
            "Anomaly detection complete"
        );

        AnomalyResult { anomalies }
    }

    fn groups<'a>(&'a self, tx: &'a Transaction) -> Groups<'a> {
        Groups {
            merchant: normalize_merchant(&tx.merchant),
            category: self
                .categorizer
                .group_label(tx)
                .map(|label| (label.trim().to_lowercase(), label)),
        }
    }

    /// Pick the baseline for one transaction from the groups' prior state
    fn baseline_for(
        &self,
        groups: &Groups<'_>,
        merchant_prior: Baseline,
        category_prior: Option<Baseline>,
    ) -> Option<(BaselineKind, String, Baseline)> {
        if !groups.merchant.is_empty() && merchant_prior.count() >= self.config.min_observations {
            return Some((BaselineKind::Merchant, groups.merchant.clone(), merchant_prior));
        }

        let (key, _) = groups.category.as_ref()?;
        let prior = category_prior?;
        if prior.count() >= self.config.min_observations {
            return Some((BaselineKind::Category, key.clone(), prior));
        }

        None
    }

    fn evaluate(
        &self,
        tx: &Transaction,
        groups: &Groups<'_>,
        merchant_prior: Baseline,
        category_prior: Option<Baseline>,
    ) -> Option<Anomaly> {
        let (kind, group, baseline) =
            match self.baseline_for(groups, merchant_prior, category_prior) {
                Some(found) => found,
                None => {
                    debug!(id = %tx.id, merchant = %tx.merchant, "Too few prior observations for a baseline");
                    return None;
                }
            };

        let mean = baseline.mean();
        let std_dev = baseline.std_dev();
        let limit = mean + self.config.threshold_sigma * std_dev;
        if tx.amount <= limit {
            return None;
        }

        let deviation_sigma = if std_dev > 0.0 {
            Some((tx.amount - mean) / std_dev)
        } else {
            None
        };

        let subject = match (kind, &groups.category) {
            (BaselineKind::Category, Some((_, label))) => format!("in category {}", label),
            _ => "at this merchant".to_string(),
        };
        let reason = match deviation_sigma {
            Some(sigma) => format!(
                "amount exceeds typical spend {} by {:.1}σ (mean ${:.2} over {} prior transactions)",
                subject,
                sigma,
                mean,
                baseline.count()
            ),
            None => format!(
                "amount exceeds typical spend {} (every one of {} prior transactions was ${:.2})",
                subject,
                baseline.count(),
                mean
            ),
        };

        debug!(
            id = %tx.id,
            amount = tx.amount,
            baseline = kind.as_str(),
            group = %group,
            mean,
            std_dev,
            "Flagged anomaly"
        );

        Some(Anomaly {
            transaction_id: tx.id.clone(),
            merchant: tx.merchant.clone(),
            date: tx.date,
            amount: tx.amount,
            baseline: kind,
            group,
            mean,
            std_dev,
            observations: baseline.count(),
            deviation_sigma,
            reason,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn jan(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn coffee_history() -> TransactionHistory {
        let amounts = [5.0, 5.5, 4.75, 5.25, 5.0, 4.5, 5.5, 5.0, 4.8, 5.2];
        let mut txs: Vec<Transaction> = amounts
            .iter()
            .enumerate()
            .map(|(i, a)| Transaction::new(format!("c{}", i), *a, jan(i as u32 + 1), "Coffee Co"))
            .collect();
        txs.push(Transaction::new("spike", 500.0, jan(25), "Coffee Co"));
        TransactionHistory::new(txs).unwrap()
    }

    #[test]
    fn test_normalize_merchant() {
        assert_eq!(normalize_merchant("  COFFEE   Co "), "coffee co");
        assert_eq!(normalize_merchant(""), "");
    }

    #[test]
    fn test_empty_history_has_no_anomalies() {
        let result = AnomalyDetector::new().detect(&TransactionHistory::empty());
        assert!(result.is_empty());
    }

    #[test]
    fn test_merchant_spike_is_flagged() {
        let result = AnomalyDetector::new().detect(&coffee_history());

        assert_eq!(result.ids(), vec!["spike"]);
        let anomaly = &result.anomalies[0];
        assert_eq!(anomaly.baseline, BaselineKind::Merchant);
        assert_eq!(anomaly.observations, 10);
        assert!(anomaly.reason.contains("at this merchant"));
        assert!(anomaly.reason.contains('σ'));
        assert!(anomaly.deviation_sigma.unwrap() > 2.5);
    }

    #[test]
    fn test_sparse_merchant_never_flagged() {
        // Two prior observations is below the minimum
        let history = TransactionHistory::new(vec![
            Transaction::new("a", 5.0, jan(1), "Tiny Shop"),
            Transaction::new("b", 5.0, jan(2), "Tiny Shop"),
            Transaction::new("c", 900.0, jan(3), "Tiny Shop"),
        ])
        .unwrap();

        assert!(AnomalyDetector::new().detect(&history).is_empty());
    }

    #[test]
    fn test_category_fallback_for_sparse_merchant() {
        let mut txs: Vec<Transaction> = (0..6)
            .map(|i| {
                Transaction::new(format!("g{}", i), 40.0 + i as f64, jan(i + 1), format!("Store {}", i))
                    .with_category("Groceries")
            })
            .collect();
        txs.push(Transaction::new("big", 400.0, jan(20), "New Store").with_category("Groceries"));
        let history = TransactionHistory::new(txs).unwrap();

        let result = AnomalyDetector::new().detect(&history);
        assert_eq!(result.ids(), vec!["big"]);
        assert_eq!(result.anomalies[0].baseline, BaselineKind::Category);
        assert!(result.anomalies[0].reason.contains("in category Groceries"));
    }

    #[test]
    fn test_uncategorized_sparse_merchant_is_skipped() {
        let mut txs: Vec<Transaction> = (0..6)
            .map(|i| Transaction::new(format!("g{}", i), 40.0, jan(i + 1), format!("Store {}", i)))
            .collect();
        txs.push(Transaction::new("big", 400.0, jan(20), "New Store"));
        let history = TransactionHistory::new(txs).unwrap();

        assert!(AnomalyDetector::new().detect(&history).is_empty());
    }

    #[test]
    fn test_constant_group_reason_without_sigma() {
        let mut txs: Vec<Transaction> = (0..4)
            .map(|i| Transaction::new(format!("n{}", i), 8.0, jan(i + 1), "Netflix"))
            .collect();
        txs.push(Transaction::new("raised", 12.0, jan(28), "Netflix"));
        let history = TransactionHistory::new(txs).unwrap();

        let result = AnomalyDetector::new().detect(&history);
        assert_eq!(result.ids(), vec!["raised"]);
        assert_eq!(result.anomalies[0].deviation_sigma, None);
        assert!(result.anomalies[0].reason.contains("$8.00"));
    }

    #[test]
    fn test_threshold_is_tunable() {
        let history = TransactionHistory::new(vec![
            Transaction::new("a", 10.0, jan(1), "Cafe"),
            Transaction::new("b", 12.0, jan(2), "Cafe"),
            Transaction::new("c", 8.0, jan(3), "Cafe"),
            Transaction::new("d", 10.0, jan(4), "Cafe"),
            Transaction::new("e", 14.0, jan(5), "Cafe"),
        ])
        .unwrap();

        let strict = AnomalyDetector::new().detect(&history);
        assert!(strict.is_empty());

        let loose = AnomalyDetector::with_config(DetectionConfig {
            threshold_sigma: 1.0,
            ..Default::default()
        })
        .detect(&history);
        assert_eq!(loose.ids(), vec!["e"]);
    }

    #[test]
    fn test_only_earlier_transactions_form_the_baseline() {
        // The first gym charge is the big one; nothing came before it
        let history = TransactionHistory::new(vec![
            Transaction::new("first", 900.0, jan(1), "Gym"),
            Transaction::new("b", 30.0, jan(2), "Gym"),
            Transaction::new("c", 31.0, jan(3), "Gym"),
            Transaction::new("d", 29.0, jan(4), "Gym"),
        ])
        .unwrap();

        assert!(AnomalyDetector::new().detect(&history).is_empty());
    }

    #[test]
    fn test_observations_count_prior_transactions_only() {
        let history = TransactionHistory::new(vec![
            Transaction::new("a", 30.0, jan(1), "Gym"),
            Transaction::new("b", 31.0, jan(2), "Gym"),
            Transaction::new("c", 29.0, jan(3), "Gym"),
            Transaction::new("spike", 900.0, jan(4), "Gym"),
            Transaction::new("e", 30.0, jan(5), "Gym"),
        ])
        .unwrap();

        let result = AnomalyDetector::new().detect(&history);
        assert_eq!(result.ids(), vec!["spike"]);
        assert_eq!(result.anomalies[0].observations, 3);
        assert!(result.anomalies[0].reason.contains("over 3 prior transactions"));
    }

    #[test]
    fn test_small_spread_on_large_amounts_is_not_flagged() {
        let history = TransactionHistory::new(vec![
            Transaction::new("a", 1_000_000.0, jan(1), "Broker"),
            Transaction::new("b", 1_000_000.2, jan(2), "Broker"),
            Transaction::new("c", 1_000_000.3, jan(3), "Broker"),
            Transaction::new("d", 1_000_000.1, jan(4), "Broker"),
            Transaction::new("e", 1_000_000.4, jan(5), "Broker"),
        ])
        .unwrap();

        assert!(AnomalyDetector::new().detect(&history).is_empty());
    }

    #[test]
    fn test_rule_category_used_for_unlabeled_fallback() {
        // No labels in the input; the rule table puts all of these in Dining
        let mut txs: Vec<Transaction> = ["Cafe Nero", "Pizza Hut", "Burger Joint", "Coffee Bar"]
            .iter()
            .enumerate()
            .map(|(i, m)| Transaction::new(format!("d{}", i), 12.0 + i as f64, jan(i as u32 + 1), *m))
            .collect();
        txs.push(Transaction::new("feast", 300.0, jan(20), "Restaurant Royale"));
        let history = TransactionHistory::new(txs).unwrap();

        let result = AnomalyDetector::new().detect(&history);
        assert_eq!(result.ids(), vec!["feast"]);
        assert_eq!(result.anomalies[0].baseline, BaselineKind::Category);
        assert!(result.anomalies[0].reason.contains("in category Dining"));

        let without_rules =
            AnomalyDetector::new().with_categorizer(Categorizer::empty()).detect(&history);
        assert!(without_rules.is_empty());
    }
}
