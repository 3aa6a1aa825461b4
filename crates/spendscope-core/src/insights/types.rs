//! Core types for insight generation

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::InsightResult;

/// Which rule produced a finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightKind {
    /// Placeholder guidance when there is nothing to analyze
    GettingStarted,
    /// Forecast trend versus the latest month
    Trend,
    /// Forecast reliability note
    Confidence,
    /// One flagged transaction
    Anomaly,
    /// Month-over-month category change
    CategoryChange,
    /// Highest spending day of the week
    Weekday,
    /// Positive reinforcement
    Encouragement,
    /// Generated by a language model on top of the rules
    Narrative,
}

impl InsightKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InsightKind::GettingStarted => "getting_started",
            InsightKind::Trend => "trend",
            InsightKind::Confidence => "confidence",
            InsightKind::Anomaly => "anomaly",
            InsightKind::CategoryChange => "category_change",
            InsightKind::Weekday => "weekday",
            InsightKind::Encouragement => "encouragement",
            InsightKind::Narrative => "narrative",
        }
    }
}

impl fmt::Display for InsightKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Severity level of an insight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Informational - no action needed
    Info,
    /// Worth attention but not urgent
    Attention,
    /// Should be addressed soon
    Warning,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Attention => "attention",
            Severity::Warning => "warning",
        }
    }

    /// Numeric priority for sorting (higher = more urgent)
    pub fn priority(&self) -> u8 {
        match self {
            Severity::Info => 1,
            Severity::Attention => 2,
            Severity::Warning => 3,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One generated insight, before flattening to plain strings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub kind: InsightKind,
    pub severity: Severity,
    pub message: String,
}

impl Finding {
    pub fn new(kind: InsightKind, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity,
            message: message.into(),
        }
    }
}

/// Findings ordered most urgent first; equal severities keep rule order
pub fn by_severity(findings: &[Finding]) -> Vec<&Finding> {
    let mut ordered: Vec<&Finding> = findings.iter().collect();
    ordered.sort_by(|a, b| b.severity.priority().cmp(&a.severity.priority()));
    ordered
}

impl From<Vec<Finding>> for InsightResult {
    fn from(findings: Vec<Finding>) -> Self {
        InsightResult::new(findings.into_iter().map(|f| f.message).collect())
    }
}
