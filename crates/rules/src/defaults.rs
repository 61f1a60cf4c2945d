//! Built-in rule table used when no rule file is configured.

use crate::rule::{ConditionDefinition, RuleDefinition};

fn condition(metric: &str, comparator: &str, threshold: f64) -> ConditionDefinition {
    ConditionDefinition {
        metric: metric.to_string(),
        comparator: comparator.to_string(),
        threshold,
    }
}

#[allow(clippy::too_many_arguments)]
fn definition(
    id: &str,
    name: &str,
    conditions: Vec<ConditionDefinition>,
    action: &str,
    magnitude: f64,
    priority: &str,
    applies_to: &str,
    potential_impact: &str,
) -> RuleDefinition {
    RuleDefinition {
        id: id.to_string(),
        name: name.to_string(),
        conditions,
        action: action.to_string(),
        magnitude,
        priority: priority.to_string(),
        applies_to: applies_to.to_string(),
        potential_impact: Some(potential_impact.to_string()),
    }
}

/// The default optimization policy for Sponsored Products style campaigns.
pub fn default_rules() -> Vec<RuleDefinition> {
    vec![
        definition(
            "keyword-wasteful-pause",
            "High ACoS with significant spend",
            vec![condition("ACOS", "GT", 40.0), condition("SPEND", "GT", 50.0)],
            "PAUSE",
            0.0,
            "HIGH",
            "KEYWORD",
            "-100% wasted spend",
        ),
        definition(
            "keyword-efficient-raise-bid",
            "High conversion rate, low ACoS",
            vec![
                condition("ACOS", "LT", 20.0),
                condition("CONVERSION_RATE", "GTE", 8.0),
            ],
            "INCREASE_BID",
            0.15,
            "HIGH",
            "KEYWORD",
            "+15% sales",
        ),
        definition(
            "keyword-high-acos-lower-bid",
            "High ACoS",
            vec![condition("ACOS", "GT", 25.0)],
            "DECREASE_BID",
            0.20,
            "MEDIUM",
            "KEYWORD",
            "-20% cost",
        ),
        definition(
            "campaign-budget-capped-raise",
            "Profitable campaign close to its budget",
            vec![
                condition("ACOS", "LT", 30.0),
                condition("BUDGET_UTILIZATION", "GTE", 90.0),
            ],
            "INCREASE_BUDGET",
            0.20,
            "MEDIUM",
            "CAMPAIGN",
            "+20% sales",
        ),
        definition(
            "campaign-unprofitable-cut-budget",
            "Unprofitable campaign",
            vec![condition("ACOS", "GT", 50.0)],
            "DECREASE_BUDGET",
            0.25,
            "LOW",
            "CAMPAIGN",
            "-25% cost",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::RecommendationEngine;

    #[test]
    fn test_default_rules_compile() {
        let engine = RecommendationEngine::new();
        let (rules, skipped) = engine.compile(&default_rules());
        assert_eq!(rules.len(), 5);
        assert!(skipped.is_empty());
    }
}
