//! Data models for spendscope
//!
//! Transactions are immutable once ingested. A [`TransactionHistory`] is the
//! validated, date-ordered view of one account's transactions that every
//! analysis component consumes. Result types are created per analysis and
//! serialize to the JSON response shapes printed by the CLI.

use std::collections::HashSet;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A single expense record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique within one history
    pub id: String,
    /// Positive = spend, negative = refund/credit
    pub amount: f64,
    pub date: NaiveDate,
    pub merchant: String,
    /// Optional free-text title ("Weekly groceries")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Category label, if one was already assigned upstream
    #[serde(default)]
    pub category: Option<String>,
}

impl Transaction {
    pub fn new(
        id: impl Into<String>,
        amount: f64,
        date: NaiveDate,
        merchant: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            amount,
            date,
            merchant: merchant.into(),
            title: None,
            category: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// The assigned category, ignoring blank labels
    pub fn category_label(&self) -> Option<&str> {
        self.category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }
}

/// Wire shape of a transaction history (`{"transactions": [...]}`)
#[derive(Debug, Deserialize)]
struct TransactionList {
    transactions: Vec<Transaction>,
}

/// Date-ordered transactions for one account
///
/// Invariants: no two transactions share an id; transactions are sorted by
/// date ascending, with same-day transactions kept in input order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TransactionList")]
pub struct TransactionHistory {
    transactions: Vec<Transaction>,
}

impl TransactionHistory {
    /// Build a history, rejecting duplicate ids and sorting by date
    pub fn new(mut transactions: Vec<Transaction>) -> Result<Self> {
        let mut seen = HashSet::with_capacity(transactions.len());
        for tx in &transactions {
            if !seen.insert(tx.id.as_str()) {
                return Err(Error::InvalidData(format!(
                    "Duplicate transaction id: {}",
                    tx.id
                )));
            }
        }

        // Stable: same-day transactions keep their input order
        transactions.sort_by_key(|t| t.date);

        Ok(Self { transactions })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Transaction> {
        self.transactions.iter()
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Transaction> {
        self.transactions.iter().find(|t| t.id == id)
    }

    /// Date of the most recent transaction
    pub fn last_date(&self) -> Option<NaiveDate> {
        self.transactions.last().map(|t| t.date)
    }
}

impl TryFrom<TransactionList> for TransactionHistory {
    type Error = Error;

    fn try_from(list: TransactionList) -> Result<Self> {
        Self::new(list.transactions)
    }
}

impl<'a> IntoIterator for &'a TransactionHistory {
    type Item = &'a Transaction;
    type IntoIter = std::slice::Iter<'a, Transaction>;

    fn into_iter(self) -> Self::IntoIter {
        self.transactions.iter()
    }
}

/// How a category label was decided
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategorySource {
    /// The transaction already carried a label
    Provided,
    /// Matched a rule in the category table
    Rule,
    /// No rule matched; the uncategorized label was used
    Fallback,
}

impl CategorySource {
    pub fn as_str(&self) -> &'static str {
        match self {
            CategorySource::Provided => "provided",
            CategorySource::Rule => "rule",
            CategorySource::Fallback => "fallback",
        }
    }
}

impl fmt::Display for CategorySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Category decided for one transaction in a history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryAssignment {
    pub transaction_id: String,
    pub category: String,
    pub source: CategorySource,
}

/// Next-period spend forecast
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastResult {
    /// Never negative
    pub forecast_amount: f64,
    /// In [0, 1]; 0 when there is not enough history to fit a trend
    pub confidence_score: f64,
}

impl ForecastResult {
    /// Degraded forecast for histories too short to trend
    pub fn flat(amount: f64) -> Self {
        Self {
            forecast_amount: amount.max(0.0),
            confidence_score: 0.0,
        }
    }
}

/// Which baseline an anomaly was measured against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BaselineKind {
    Merchant,
    Category,
}

impl BaselineKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BaselineKind::Merchant => "merchant",
            BaselineKind::Category => "category",
        }
    }
}

impl fmt::Display for BaselineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A transaction flagged as statistically unusual
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anomaly {
    pub transaction_id: String,
    pub merchant: String,
    pub date: NaiveDate,
    pub amount: f64,
    /// Merchant or category baseline
    pub baseline: BaselineKind,
    /// Group key the baseline was computed over
    pub group: String,
    /// Mean of the earlier observations in the group
    pub mean: f64,
    pub std_dev: f64,
    /// Number of earlier observations in the group
    pub observations: usize,
    /// Standard deviations above the mean (None when the group never varied)
    pub deviation_sigma: Option<f64>,
    pub reason: String,
}

/// Anomalies found in one history, in history order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnomalyResult {
    pub anomalies: Vec<Anomaly>,
}

impl AnomalyResult {
    pub fn is_empty(&self) -> bool {
        self.anomalies.is_empty()
    }

    pub fn len(&self) -> usize {
        self.anomalies.len()
    }

    pub fn ids(&self) -> Vec<&str> {
        self.anomalies
            .iter()
            .map(|a| a.transaction_id.as_str())
            .collect()
    }

    pub fn contains(&self, transaction_id: &str) -> bool {
        self.anomalies
            .iter()
            .any(|a| a.transaction_id == transaction_id)
    }
}

/// Ordered human-readable insights
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InsightResult {
    pub insights: Vec<String>,
}

impl InsightResult {
    pub fn new(insights: Vec<String>) -> Self {
        Self { insights }
    }

    pub fn is_empty(&self) -> bool {
        self.insights.is_empty()
    }
}

// ============================================================================
// Response shapes
// ============================================================================

/// `{"anomalies": [ids], "reason": "...", "details": [...]}`
///
/// `anomalies` and `reason` keep the shape existing callers read; `reason`
/// carries the first anomaly's reason and is omitted when nothing was flagged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnomalyResponse {
    pub anomalies: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default)]
    pub details: Vec<Anomaly>,
}

impl From<&AnomalyResult> for AnomalyResponse {
    fn from(result: &AnomalyResult) -> Self {
        Self {
            anomalies: result
                .anomalies
                .iter()
                .map(|a| a.transaction_id.clone())
                .collect(),
            reason: result.anomalies.first().map(|a| a.reason.clone()),
            details: result.anomalies.clone(),
        }
    }
}

/// `{"category": "..."}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryResponse {
    pub category: String,
}
