//! Language-model enhanced insights
//!
//! Runs the rule-based generator first, then asks Ollama for one extra
//! sentence summarizing the month. Any failure talking to the model leaves
//! the rule output untouched.

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::ai::OllamaClient;
use crate::error::Result;

use super::rules::RuleBasedInsights;
use super::strategy::{InsightInput, InsightStrategy};
use super::types::{Finding, InsightKind, Severity};

const MAX_NARRATIVE_CHARS: usize = 300;

/// Rule insights plus a single generated summary line
#[derive(Clone)]
pub struct LlmInsights {
    rules: RuleBasedInsights,
    client: OllamaClient,
}

impl LlmInsights {
    pub fn new(rules: RuleBasedInsights, client: OllamaClient) -> Self {
        Self { rules, client }
    }

    pub fn client(&self) -> &OllamaClient {
        &self.client
    }

    fn prompt(input: &InsightInput<'_>, rule_findings: &[Finding]) -> String {
        let mut prompt = String::from(
            "You are a personal finance assistant. In one short, friendly sentence, \
             summarize this person's spending outlook. Do not invent numbers.\n\n",
        );
        prompt.push_str(&format!(
            "Forecast for next month: ${:.2} (confidence {:.2})\n",
            input.forecast.forecast_amount, input.forecast.confidence_score
        ));
        prompt.push_str(&format!(
            "Transactions analyzed: {}\nUnusual charges: {}\n",
            input.history.len(),
            input.anomalies.len()
        ));
        prompt.push_str("Observations:\n");
        for finding in rule_findings {
            prompt.push_str("- ");
            prompt.push_str(&finding.message);
            prompt.push('\n');
        }
        prompt
    }
}

/// First non-empty line of a model reply, unquoted and length-limited
pub(crate) fn clean_narrative(raw: &str) -> Option<String> {
    let line = raw
        .lines()
        .map(|l| l.trim().trim_start_matches(['-', '*']).trim())
        .find(|l| !l.is_empty())?;
    let line = line.trim_matches('"').trim();
    if line.is_empty() {
        return None;
    }

    if line.chars().count() <= MAX_NARRATIVE_CHARS {
        return Some(line.to_string());
    }
    let cut: String = line.chars().take(MAX_NARRATIVE_CHARS - 3).collect();
    Some(format!("{}...", cut.trim_end()))
}

#[async_trait]
impl InsightStrategy for LlmInsights {
    fn name(&self) -> &'static str {
        "llm"
    }

    async fn findings(&self, input: &InsightInput<'_>) -> Result<Vec<Finding>> {
        let mut findings = self
            .rules
            .findings(input.forecast, input.anomalies, input.history);

        if input.history.is_empty() {
            return Ok(findings);
        }

        let prompt = Self::prompt(input, &findings);
        match self.client.generate(&prompt).await {
            Ok(reply) => match clean_narrative(&reply) {
                Some(line) => {
                    debug!(model = %self.client.model(), "Added generated summary");
                    findings.push(Finding::new(InsightKind::Narrative, Severity::Info, line));
                }
                None => warn!("Model returned an empty summary; using rule insights only"),
            },
            Err(e) => warn!("Insight generation via Ollama failed: {}", e),
        }

        Ok(findings)
    }
}
