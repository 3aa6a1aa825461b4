//! Rule-based transaction categorization
//!
//! Categories come from an ordered rule table. The first rule whose pattern
//! matches the merchant (or, failing that, the title) wins, so more specific
//! rules belong earlier in the table. Unmatched transactions get the
//! uncategorized label; categorization never fails once the table is built.

use std::fmt;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::{CategoryAssignment, CategorySource, Transaction, TransactionHistory};

/// Label returned when no rule matches
pub const UNCATEGORIZED: &str = "uncategorized";

/// How a rule pattern is compared against merchant text
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternType {
    /// Substring match; `|` separates alternatives
    #[default]
    Contains,
    /// Whole (trimmed) text must equal the pattern
    Exact,
    /// Regular expression
    Regex,
}

impl PatternType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PatternType::Contains => "contains",
            PatternType::Exact => "exact",
            PatternType::Regex => "regex",
        }
    }
}

impl fmt::Display for PatternType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Merchant pattern → category label
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRule {
    pub pattern: String,
    pub category: String,
    #[serde(default)]
    pub pattern_type: PatternType,
}

impl CategoryRule {
    pub fn contains(pattern: &str, category: &str) -> Self {
        Self {
            pattern: pattern.to_string(),
            category: category.to_string(),
            pattern_type: PatternType::Contains,
        }
    }

    pub fn exact(pattern: &str, category: &str) -> Self {
        Self {
            pattern_type: PatternType::Exact,
            ..Self::contains(pattern, category)
        }
    }

    pub fn regex(pattern: &str, category: &str) -> Self {
        Self {
            pattern_type: PatternType::Regex,
            ..Self::contains(pattern, category)
        }
    }
}

/// Built-in rule table, most specific patterns first
pub fn default_rules() -> Vec<CategoryRule> {
    vec![
        CategoryRule::contains("landlord|mortgage|property management", "Housing"),
        CategoryRule::regex(r"\brent\b", "Housing"),
        CategoryRule::contains(
            "orange fiber|zain|umniah|electric|water company|internet|mobile bill",
            "Utilities",
        ),
        CategoryRule::contains(
            "netflix|spotify|steam|playstation|xbox|cinema|disney",
            "Entertainment",
        ),
        CategoryRule::contains(
            "carrefour|cozmo|hypermarket|supermarket|grocery|safeway",
            "Groceries",
        ),
        CategoryRule::exact("miles", "Groceries"),
        CategoryRule::contains(
            "starbucks|dunkin|coffee|cafe|cafeteria|restaurant|shawerma|pizza|burger|abu jbara|al kalha|firefly|astrolabe",
            "Dining",
        ),
        CategoryRule::contains("careem|uber|taxi|petrol|fuel|gas station|manaseer", "Transport"),
        CategoryRule::regex(r"\bbus\b|\btotal\b", "Transport"),
        CategoryRule::contains("mall|amazon|ikea|clothing", "Shopping"),
        CategoryRule::contains("pharmacy|clinic|hospital|dental", "Healthcare"),
    ]
}

#[derive(Debug, Clone)]
enum Matcher {
    Contains(Vec<String>),
    Exact(String),
    Regex(Regex),
}

impl Matcher {
    fn matches(&self, text: &str) -> bool {
        match self {
            Matcher::Contains(needles) => {
                let haystack = text.to_lowercase();
                needles.iter().any(|n| haystack.contains(n.as_str()))
            }
            Matcher::Exact(expected) => text.trim().to_lowercase() == *expected,
            Matcher::Regex(re) => re.is_match(text),
        }
    }
}

#[derive(Debug, Clone)]
struct CompiledRule {
    rule: CategoryRule,
    matcher: Matcher,
}

impl CompiledRule {
    fn compile(rule: CategoryRule) -> Result<Self> {
        if rule.pattern.trim().is_empty() {
            return Err(Error::Config(format!(
                "Empty pattern for category rule '{}'",
                rule.category
            )));
        }
        if rule.category.trim().is_empty() {
            return Err(Error::Config(format!(
                "Empty category for pattern '{}'",
                rule.pattern
            )));
        }

        let matcher = match rule.pattern_type {
            PatternType::Contains => Matcher::Contains(
                rule.pattern
                    .split('|')
                    .map(|p| p.trim().to_lowercase())
                    .filter(|p| !p.is_empty())
                    .collect(),
            ),
            PatternType::Exact => Matcher::Exact(rule.pattern.trim().to_lowercase()),
            PatternType::Regex => Matcher::Regex(
                RegexBuilder::new(&rule.pattern)
                    .case_insensitive(true)
                    .build()?,
            ),
        };

        Ok(Self { rule, matcher })
    }
}

/// Categorizer over an immutable, compiled rule table
#[derive(Debug, Clone)]
pub struct Categorizer {
    rules: Vec<CompiledRule>,
    uncategorized: String,
}

impl Default for Categorizer {
    fn default() -> Self {
        Self::new(default_rules()).expect("valid built-in category rules")
    }
}

impl Categorizer {
    /// Compile a rule table; table order is match priority
    pub fn new(rules: Vec<CategoryRule>) -> Result<Self> {
        Self::with_label(rules, UNCATEGORIZED)
    }

    /// Compile a rule table with a custom uncategorized label
    pub fn with_label(rules: Vec<CategoryRule>, uncategorized: &str) -> Result<Self> {
        let rules = rules
            .into_iter()
            .map(CompiledRule::compile)
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            rules,
            uncategorized: uncategorized.to_string(),
        })
    }

    /// A categorizer with no rules (everything is uncategorized)
    pub fn empty() -> Self {
        Self {
            rules: vec![],
            uncategorized: UNCATEGORIZED.to_string(),
        }
    }

    pub fn rules(&self) -> impl Iterator<Item = &CategoryRule> {
        self.rules.iter().map(|r| &r.rule)
    }

    pub fn uncategorized_label(&self) -> &str {
        &self.uncategorized
    }

    /// Category for a (merchant, title) pair
    ///
    /// An empty merchant is always uncategorized.
    pub fn categorize(&self, merchant: &str, title: &str) -> String {
        self.find_rule(merchant, title)
            .map(|r| r.category.clone())
            .unwrap_or_else(|| self.uncategorized.clone())
    }

    /// First rule matching the merchant, or the title when the merchant misses
    pub fn find_rule(&self, merchant: &str, title: &str) -> Option<&CategoryRule> {
        if merchant.trim().is_empty() {
            return None;
        }

        let found = self
            .rules
            .iter()
            .find(|r| r.matcher.matches(merchant))
            .or_else(|| {
                if title.trim().is_empty() {
                    None
                } else {
                    self.rules.iter().find(|r| r.matcher.matches(title))
                }
            });

        if let Some(rule) = found {
            debug!(
                merchant,
                pattern = %rule.rule.pattern,
                category = %rule.rule.category,
                "Category rule matched"
            );
        }

        found.map(|r| &r.rule)
    }

    /// Category for a transaction, keeping a label it already carries
    pub fn assign(&self, transaction: &Transaction) -> CategoryAssignment {
        if let Some(label) = transaction.category_label() {
            return CategoryAssignment {
                transaction_id: transaction.id.clone(),
                category: label.to_string(),
                source: CategorySource::Provided,
            };
        }

        let title = transaction.title.as_deref().unwrap_or("");
        match self.find_rule(&transaction.merchant, title) {
            Some(rule) => CategoryAssignment {
                transaction_id: transaction.id.clone(),
                category: rule.category.clone(),
                source: CategorySource::Rule,
            },
            None => CategoryAssignment {
                transaction_id: transaction.id.clone(),
                category: self.uncategorized.clone(),
                source: CategorySource::Fallback,
            },
        }
    }

    /// Category a transaction is grouped under: its own label, else the
    /// matching rule's category. `None` when neither applies.
    pub fn group_label<'a>(&'a self, transaction: &'a Transaction) -> Option<&'a str> {
        if let Some(label) = transaction.category_label() {
            return Some(label);
        }
        let title = transaction.title.as_deref().unwrap_or("");
        self.find_rule(&transaction.merchant, title)
            .map(|r| r.category.as_str())
    }

    /// Assign a category to every transaction, in history order
    pub fn assign_all(&self, history: &TransactionHistory) -> Vec<CategoryAssignment> {
        history.iter().map(|t| self.assign(t)).collect()
    }
}
