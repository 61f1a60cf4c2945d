//! Recommendation engine — evaluates rules against performance records and
//! returns ranked, side-effect-free recommendations.

use std::collections::HashSet;

use bidwise_core::types::PerformanceRecord;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use utoipa::ToSchema;

use crate::loader::RuleSet;
use crate::rule::{Priority, Rule, RuleAction, RuleDefinition, RuleError};

/// Lowest bid or budget the engine will ever suggest.
pub const MIN_SUGGESTED_VALUE: f64 = 0.01;

/// One suggested change produced by a firing rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Recommendation {
    pub record_id: String,
    pub rule_id: String,
    pub action: RuleAction,
    /// Current bid or budget; `None` for pauses.
    pub current_value: Option<f64>,
    /// Suggested bid or budget; `None` for pauses.
    pub suggested_value: Option<f64>,
    pub reason: String,
    pub priority: Priority,
    /// Expected effect copied from the rule, e.g. "+15% sales".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub potential_impact: Option<String>,
}

/// A rule definition rejected during compilation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SkippedRule {
    pub rule_id: String,
    pub reason: String,
}

/// Contradictory recommendations emitted for the same record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Conflict {
    pub record_id: String,
    pub rule_ids: Vec<String>,
    pub actions: Vec<RuleAction>,
}

/// Everything one evaluation run produced.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct EvaluationReport {
    pub recommendations: Vec<Recommendation>,
    pub skipped_rules: Vec<SkippedRule>,
    pub conflicts: Vec<Conflict>,
    pub diagnostics: Vec<String>,
}

impl EvaluationReport {
    pub fn is_empty(&self) -> bool {
        self.recommendations.is_empty()
    }

    pub fn skipped_rule_ids(&self) -> Vec<&str> {
        self.skipped_rules.iter().map(|s| s.rule_id.as_str()).collect()
    }
}

/// Stateless evaluator; safe to share and to call concurrently.
#[derive(Debug, Clone)]
pub struct RecommendationEngine;

impl RecommendationEngine {
    pub fn new() -> Self {
        Self
    }

    /// Validates rule definitions. Invalid or duplicate rules are returned as
    /// skipped instead of failing the whole set.
    pub fn compile(&self, definitions: &[RuleDefinition]) -> (Vec<Rule>, Vec<SkippedRule>) {
        let mut rules = Vec::with_capacity(definitions.len());
        let mut skipped = Vec::new();
        let mut seen: HashSet<&str> = HashSet::new();

        for def in definitions {
            let compiled = Rule::try_from(def).and_then(|rule| {
                if seen.insert(def.id.as_str()) {
                    Ok(rule)
                } else {
                    Err(RuleError::DuplicateId(def.id.clone()))
                }
            });

            match compiled {
                Ok(rule) => rules.push(rule),
                Err(e) => {
                    warn!(rule_id = %def.id, error = %e, "Skipping invalid rule");
                    metrics::counter!("rules.skipped").increment(1);
                    skipped.push(SkippedRule {
                        rule_id: def.id.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        (rules, skipped)
    }

    /// Compiles `definitions` and evaluates them against `records`.
    pub fn evaluate(
        &self,
        records: &[PerformanceRecord],
        definitions: &[RuleDefinition],
    ) -> EvaluationReport {
        self.evaluate_with_rejected(records, definitions, Vec::new())
    }

    /// Like [`evaluate`](Self::evaluate), but also reports the entries the
    /// loader could not read, ahead of the rules rejected by compilation.
    pub fn evaluate_set(&self, records: &[PerformanceRecord], set: &RuleSet) -> EvaluationReport {
        self.evaluate_with_rejected(records, &set.definitions, set.rejected.clone())
    }

    fn evaluate_with_rejected(
        &self,
        records: &[PerformanceRecord],
        definitions: &[RuleDefinition],
        mut skipped_rules: Vec<SkippedRule>,
    ) -> EvaluationReport {
        let (rules, compile_skipped) = self.compile(definitions);
        skipped_rules.extend(compile_skipped);
        if !skipped_rules.is_empty() {
            let ids: Vec<&str> = skipped_rules.iter().map(|s| s.rule_id.as_str()).collect();
            warn!(skipped = ?ids, "Some rules were skipped");
        }

        let mut report = self.evaluate_rules(records, &rules);
        report.skipped_rules = skipped_rules;
        report
    }

    /// Evaluates already-validated rules against `records`.
    ///
    /// Output is ordered by priority, then by the record's spend (highest
    /// first), then by input order.
    pub fn evaluate_rules(&self, records: &[PerformanceRecord], rules: &[Rule]) -> EvaluationReport {
        let mut report = EvaluationReport::default();
        if records.is_empty() || rules.is_empty() {
            return report;
        }
        metrics::counter!("rules.evaluations").increment(1);

        let mut ranked: Vec<(f64, Recommendation)> = Vec::new();

        for record in records {
            let first = ranked.len();

            for rule in rules.iter().filter(|r| r.applies_to_record(record)) {
                if !rule.fires(record) {
                    continue;
                }
                match recommend(rule, record) {
                    Some(rec) => {
                        debug!(
                            record_id = %record.id,
                            rule_id = %rule.id,
                            action = %rule.action,
                            "Rule fired"
                        );
                        ranked.push((record.spend, rec));
                    }
                    None => report.diagnostics.push(format!(
                        "rule '{}' fired on '{}' but the record has no {} to adjust",
                        rule.id,
                        record.id,
                        if rule.action.is_bid_change() { "bid" } else { "budget" },
                    )),
                }
            }

            let emitted: Vec<&Recommendation> = ranked[first..].iter().map(|(_, r)| r).collect();
            if let Some(conflict) = detect_conflict(&record.id, &emitted) {
                warn!(
                    record_id = %record.id,
                    rules = ?conflict.rule_ids,
                    "Contradictory recommendations for record"
                );
                report.conflicts.push(conflict);
            }
        }

        // `sort_by` is stable, so equal keys keep record-then-rule order.
        ranked.sort_by(|(spend_a, a), (spend_b, b)| {
            a.priority
                .cmp(&b.priority)
                .then_with(|| spend_b.total_cmp(spend_a))
        });

        report.recommendations = ranked.into_iter().map(|(_, rec)| rec).collect();
        metrics::counter!("recommendations.emitted").increment(report.recommendations.len() as u64);

        info!(
            records = records.len(),
            rules = rules.len(),
            recommendations = report.recommendations.len(),
            conflicts = report.conflicts.len(),
            "Rule evaluation complete"
        );

        report
    }
}

impl Default for RecommendationEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds the recommendation for a rule that fired. `None` when a bid or
/// budget rule fired on a record that has no such value.
fn recommend(rule: &Rule, record: &PerformanceRecord) -> Option<Recommendation> {
    let current_value = if rule.action.is_bid_change() {
        Some(record.bid?)
    } else if rule.action.is_budget_change() {
        Some(record.budget?)
    } else {
        None
    };

    let suggested_value = match (current_value, rule.action.factor(rule.magnitude)) {
        (Some(current), Some(factor)) => Some(adjust(current, factor)),
        _ => None,
    };

    let conditions = rule
        .conditions
        .iter()
        .map(|c| c.describe(record))
        .collect::<Vec<_>>()
        .join(" and ");

    Some(Recommendation {
        record_id: record.id.clone(),
        rule_id: rule.id.clone(),
        action: rule.action,
        current_value,
        suggested_value,
        reason: format!("{}: {}", rule.name, conditions),
        priority: rule.priority,
        potential_impact: rule.potential_impact.clone(),
    })
}

/// Scales a value, rounds to cents and floors at [`MIN_SUGGESTED_VALUE`].
fn adjust(current: f64, factor: f64) -> f64 {
    let rounded = (current * factor * 100.0).round() / 100.0;
    rounded.max(MIN_SUGGESTED_VALUE)
}

fn detect_conflict(record_id: &str, emitted: &[&Recommendation]) -> Option<Conflict> {
    let mut involved = vec![false; emitted.len()];
    for i in 0..emitted.len() {
        for j in (i + 1)..emitted.len() {
            if emitted[i].action.conflicts_with(&emitted[j].action) {
                involved[i] = true;
                involved[j] = true;
            }
        }
    }

    let members: Vec<&Recommendation> = emitted
        .iter()
        .zip(&involved)
        .filter(|(_, hit)| **hit)
        .map(|(rec, _)| *rec)
        .collect();
    if members.is_empty() {
        return None;
    }

    Some(Conflict {
        record_id: record_id.to_string(),
        rule_ids: members.iter().map(|r| r.rule_id.clone()).collect(),
        actions: members.iter().map(|r| r.action).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::{AppliesTo, Comparator, Condition, Metric};
    use bidwise_core::types::{EntityState, EntityType};

    fn keyword(id: &str, bid: f64, spend: f64, sales: f64) -> PerformanceRecord {
        PerformanceRecord {
            id: id.to_string(),
            entity_type: EntityType::Keyword,
            name: id.to_string(),
            state: EntityState::Enabled,
            bid: Some(bid),
            budget: None,
            spend,
            sales,
            clicks: 100,
            impressions: 4000,
            orders: 10,
        }
    }

    fn rule(
        id: &str,
        conditions: Vec<Condition>,
        action: RuleAction,
        magnitude: f64,
        priority: Priority,
    ) -> Rule {
        Rule {
            id: id.to_string(),
            name: id.to_string(),
            conditions,
            action,
            magnitude,
            priority,
            applies_to: AppliesTo::Both,
            potential_impact: None,
        }
    }

    fn acos_gt(threshold: f64) -> Condition {
        Condition::new(Metric::Acos, Comparator::Gt, threshold)
    }

    #[test]
    fn test_decrease_bid_scenario() {
        let engine = RecommendationEngine::new();
        let records = vec![keyword("kw-1", 1.50, 100.0, 200.0)];
        let rules = vec![rule(
            "lower-bid",
            vec![acos_gt(25.0)],
            RuleAction::DecreaseBid,
            0.20,
            Priority::Medium,
        )];

        let report = engine.evaluate_rules(&records, &rules);
        assert_eq!(report.recommendations.len(), 1);
        let rec = &report.recommendations[0];
        assert_eq!(rec.record_id, "kw-1");
        assert_eq!(rec.current_value, Some(1.50));
        assert!((rec.suggested_value.unwrap() - 1.20).abs() < 1e-9);
        assert_eq!(rec.reason, "lower-bid: ACoS 50.00% > 25.00%");
    }

    #[test]
    fn test_threshold_is_strict_for_gt() {
        let engine = RecommendationEngine::new();
        // ACoS exactly 25%.
        let records = vec![keyword("kw", 1.0, 25.0, 100.0)];

        let gt = vec![rule("gt", vec![acos_gt(25.0)], RuleAction::DecreaseBid, 0.2, Priority::Medium)];
        assert!(engine.evaluate_rules(&records, &gt).is_empty());

        let gte = vec![rule(
            "gte",
            vec![Condition::new(Metric::Acos, Comparator::Gte, 25.0)],
            RuleAction::DecreaseBid,
            0.2,
            Priority::Medium,
        )];
        assert_eq!(engine.evaluate_rules(&records, &gte).recommendations.len(), 1);
    }

    #[test]
    fn test_potential_impact_carried_to_recommendation() {
        let engine = RecommendationEngine::new();
        let definitions: Vec<RuleDefinition> = serde_json::from_str(
            r#"[{"id": "lower", "conditions": [{"metric": "ACOS", "comparator": "GT", "threshold": 25}], "action": "DECREASE_BID", "magnitude": 0.2, "potential_impact": "-20% cost"}]"#,
        )
        .unwrap();
        let report = engine.evaluate(&[keyword("kw", 1.5, 100.0, 200.0)], &definitions);
        assert_eq!(
            report.recommendations[0].potential_impact.as_deref(),
            Some("-20% cost")
        );
    }

    #[test]
    fn test_pause_requires_every_guard() {
        let engine = RecommendationEngine::new();
        let pause = rule(
            "pause",
            vec![
                acos_gt(40.0),
                Condition::new(Metric::Spend, Comparator::Gt, 50.0),
            ],
            RuleAction::Pause,
            0.0,
            Priority::High,
        );

        let fired = engine.evaluate_rules(&[keyword("kw", 1.0, 60.0, 100.0)], &[pause.clone()]);
        assert_eq!(fired.recommendations.len(), 1);
        assert_eq!(fired.recommendations[0].action, RuleAction::Pause);
        assert_eq!(fired.recommendations[0].suggested_value, None);
        assert_eq!(fired.recommendations[0].current_value, None);

        let not_fired = engine.evaluate_rules(&[keyword("kw", 1.0, 40.0, 100.0)], &[pause]);
        assert!(not_fired.recommendations.is_empty());
    }

    #[test]
    fn test_floor_at_one_cent() {
        let engine = RecommendationEngine::new();
        let rules = vec![rule(
            "slash",
            vec![acos_gt(10.0)],
            RuleAction::DecreaseBid,
            1.5,
            Priority::Low,
        )];
        let report = engine.evaluate_rules(&[keyword("kw", 0.02, 50.0, 100.0)], &rules);
        assert_eq!(report.recommendations[0].suggested_value, Some(MIN_SUGGESTED_VALUE));
    }

    #[test]
    fn test_ordering_by_priority_then_spend() {
        let engine = RecommendationEngine::new();
        let records = vec![
            keyword("small", 1.0, 50.0, 100.0),
            keyword("big", 1.0, 100.0, 100.0),
        ];
        let rules = vec![
            rule("low", vec![acos_gt(0.0)], RuleAction::DecreaseBid, 0.1, Priority::Low),
            rule("high", vec![acos_gt(0.0)], RuleAction::DecreaseBid, 0.1, Priority::High),
        ];

        let report = engine.evaluate_rules(&records, &rules);
        let order: Vec<(&str, &str)> = report
            .recommendations
            .iter()
            .map(|r| (r.rule_id.as_str(), r.record_id.as_str()))
            .collect();
        assert_eq!(
            order,
            vec![("high", "big"), ("high", "small"), ("low", "big"), ("low", "small")]
        );
    }

    #[test]
    fn test_equal_keys_keep_input_order() {
        let engine = RecommendationEngine::new();
        let records = vec![keyword("a", 1.0, 80.0, 100.0), keyword("b", 1.0, 80.0, 100.0)];
        let rules = vec![
            rule("r1", vec![acos_gt(0.0)], RuleAction::DecreaseBid, 0.1, Priority::Medium),
            rule("r2", vec![acos_gt(0.0)], RuleAction::Pause, 0.0, Priority::Medium),
        ];
        let report = engine.evaluate_rules(&records, &rules);
        let order: Vec<(&str, &str)> = report
            .recommendations
            .iter()
            .map(|r| (r.record_id.as_str(), r.rule_id.as_str()))
            .collect();
        assert_eq!(order, vec![("a", "r1"), ("a", "r2"), ("b", "r1"), ("b", "r2")]);
    }

    #[test]
    fn test_conflicting_rules_are_emitted_and_flagged() {
        let engine = RecommendationEngine::new();
        let rules = vec![
            rule("up", vec![acos_gt(10.0)], RuleAction::IncreaseBid, 0.1, Priority::High),
            rule("down", vec![acos_gt(20.0)], RuleAction::DecreaseBid, 0.1, Priority::High),
            rule("other", vec![acos_gt(20.0)], RuleAction::DecreaseBudget, 0.1, Priority::High),
        ];
        let report = engine.evaluate_rules(&[keyword("kw", 1.0, 50.0, 100.0)], &rules);

        // `other` targets the budget, which a keyword does not have.
        assert_eq!(report.recommendations.len(), 2);
        assert_eq!(report.diagnostics.len(), 1);
        assert_eq!(report.conflicts.len(), 1);
        assert_eq!(report.conflicts[0].record_id, "kw");
        assert_eq!(report.conflicts[0].rule_ids, vec!["up", "down"]);
        assert_eq!(
            report.conflicts[0].actions,
            vec![RuleAction::IncreaseBid, RuleAction::DecreaseBid]
        );
    }

    #[test]
    fn test_scope_filters_entity_type() {
        let engine = RecommendationEngine::new();
        let mut campaign_only = rule(
            "campaign",
            vec![acos_gt(0.0)],
            RuleAction::Pause,
            0.0,
            Priority::High,
        );
        campaign_only.applies_to = AppliesTo::Campaign;
        let report = engine.evaluate_rules(&[keyword("kw", 1.0, 50.0, 100.0)], &[campaign_only]);
        assert!(report.is_empty());
    }

    #[test]
    fn test_invalid_definition_is_skipped() {
        let engine = RecommendationEngine::new();
        let definitions: Vec<RuleDefinition> = serde_json::from_str(
            r#"[
                {"id": "bad", "conditions": [{"metric": "MOOD", "comparator": "GT", "threshold": 1}], "action": "PAUSE"},
                {"id": "good", "conditions": [{"metric": "ACOS", "comparator": "GT", "threshold": 25}], "action": "DECREASE_BID", "magnitude": 0.2},
                {"id": "good", "conditions": [{"metric": "SPEND", "comparator": "GT", "threshold": 0}], "action": "PAUSE"}
            ]"#,
        )
        .unwrap();

        let report = engine.evaluate(&[keyword("kw", 1.5, 100.0, 200.0)], &definitions);
        assert_eq!(report.recommendations.len(), 1);
        assert_eq!(report.recommendations[0].rule_id, "good");
        assert_eq!(report.skipped_rule_ids(), vec!["bad", "good"]);
        assert!(report.skipped_rules[1].reason.contains("duplicate"));
    }

    #[test]
    fn test_empty_inputs() {
        let engine = RecommendationEngine::new();
        let rules = vec![rule("r", vec![acos_gt(0.0)], RuleAction::Pause, 0.0, Priority::Low)];
        assert!(engine.evaluate_rules(&[], &rules).recommendations.is_empty());
        assert!(engine
            .evaluate_rules(&[keyword("kw", 1.0, 1.0, 1.0)], &[])
            .recommendations
            .is_empty());
    }

    #[test]
    fn test_adjust_rounds_to_cents() {
        assert_eq!(adjust(1.5, 1.2), 1.8);
        assert_eq!(adjust(1.2, 0.8), 0.96);
        assert_eq!(adjust(1000.0, 1.2), 1200.0);
        assert_eq!(adjust(0.01, 0.5), MIN_SUGGESTED_VALUE);
    }
}
