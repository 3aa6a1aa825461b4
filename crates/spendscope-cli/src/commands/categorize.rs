//! Categorization command implementations

use anyhow::{Context, Result};
use spendscope_core::{AnalyticsConfig, CategoryResponse};

use super::core::print_json;
use super::truncate;

pub fn run_categorize(config: &AnalyticsConfig, merchant: &str, title: &str) -> Result<CategoryResponse> {
    let categorizer = config
        .categories
        .categorizer()
        .context("Invalid category rules")?;

    Ok(CategoryResponse {
        category: categorizer.categorize(merchant, title),
    })
}

pub fn cmd_categorize(config: &AnalyticsConfig, merchant: &str, title: &str, json: bool) -> Result<()> {
    let response = run_categorize(config, merchant, title)?;

    if json {
        return print_json(&response);
    }

    println!("🏷️  {} → {}", merchant, response.category);
    Ok(())
}

pub fn cmd_rules(config: &AnalyticsConfig, json: bool) -> Result<()> {
    let rules = &config.categories.rules;

    if json {
        return print_json(rules);
    }

    println!("🏷️  Category rules (first match wins)");
    println!();
    println!("   {:<4} {:<16} {:<9} Pattern", "#", "Category", "Type");
    println!("   {}", "─".repeat(70));
    for (i, rule) in rules.iter().enumerate() {
        println!(
            "   {:<4} {:<16} {:<9} {}",
            i + 1,
            truncate(&rule.category, 16),
            rule.pattern_type.as_str(),
            truncate(&rule.pattern, 40)
        );
    }
    println!();
    println!(
        "   Unmatched merchants are labeled \"{}\"",
        config.categories.uncategorized_label
    );

    Ok(())
}
