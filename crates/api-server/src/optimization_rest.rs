//! Optimization REST API endpoints — suggestions, rules, history, apply.

use axum::extract::State;
use axum::Json;
use bidwise_catalog::models::{ApplyOutcome, HistoryEntry};
use bidwise_rules::{EvaluationReport, Recommendation, RuleDefinition};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

use crate::rest::AppState;

/// Optional filter for `POST /v1/optimization/apply`. Omitted lists match
/// everything.
#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct ApplyRequest {
    #[serde(default)]
    pub record_ids: Option<Vec<String>>,
    #[serde(default)]
    pub rule_ids: Option<Vec<String>>,
}

impl ApplyRequest {
    fn selects(&self, rec: &Recommendation) -> bool {
        let record_ok = self
            .record_ids
            .as_ref()
            .map_or(true, |ids| ids.contains(&rec.record_id));
        let rule_ok = self
            .rule_ids
            .as_ref()
            .map_or(true, |ids| ids.contains(&rec.rule_id));
        record_ok && rule_ok
    }
}

fn current_report(state: &AppState) -> EvaluationReport {
    state
        .engine
        .evaluate_set(&state.catalog.records(), &state.rules)
}

/// GET /v1/optimization/suggestions — Evaluate the active rules against the catalog.
#[utoipa::path(
    get,
    path = "/v1/optimization/suggestions",
    tag = "Optimization",
    responses((status = 200, description = "Ranked recommendations with diagnostics", body = EvaluationReport))
)]
pub async fn suggestions(State(state): State<AppState>) -> Json<EvaluationReport> {
    Json(current_report(&state))
}

/// GET /v1/optimization/rules — The active rule definitions.
#[utoipa::path(
    get,
    path = "/v1/optimization/rules",
    tag = "Optimization",
    responses((status = 200, description = "Rule definitions", body = [RuleDefinition]))
)]
pub async fn rules(State(state): State<AppState>) -> Json<Vec<RuleDefinition>> {
    Json(state.rules.definitions.clone())
}

/// GET /v1/optimization/history — Applied optimizations, newest first.
#[utoipa::path(
    get,
    path = "/v1/optimization/history",
    tag = "Optimization",
    responses((status = 200, description = "Optimization history", body = [HistoryEntry]))
)]
pub async fn history(State(state): State<AppState>) -> Json<Vec<HistoryEntry>> {
    Json(state.catalog.history())
}

/// POST /v1/optimization/apply — Apply current suggestions, optionally filtered.
#[utoipa::path(
    post,
    path = "/v1/optimization/apply",
    tag = "Optimization",
    request_body(content = ApplyRequest, description = "Optional record/rule filter"),
    responses((status = 200, description = "What was applied and what was skipped", body = ApplyOutcome))
)]
pub async fn apply(
    State(state): State<AppState>,
    request: Option<Json<ApplyRequest>>,
) -> Json<ApplyOutcome> {
    let filter = request.map(|Json(r)| r).unwrap_or_default();
    let selected: Vec<Recommendation> = current_report(&state)
        .recommendations
        .into_iter()
        .filter(|rec| filter.selects(rec))
        .collect();

    info!(selected = selected.len(), "Applying optimizations");
    let outcome = state.catalog.apply(&selected);
    metrics::counter!("api.optimization.applied").increment(outcome.applied as u64);
    Json(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bidwise_catalog::CatalogStore;
    use bidwise_core::types::EntityState;
    use bidwise_rules::{default_rules, ConditionDefinition, RuleSet, SkippedRule};
    use std::sync::Arc;

    fn state() -> AppState {
        AppState::new(
            Arc::new(CatalogStore::with_demo_data()),
            default_rules(),
            "node-test".to_string(),
        )
    }

    #[tokio::test]
    async fn test_suggestions_ranked() {
        let Json(report) = suggestions(State(state())).await;
        assert_eq!(report.recommendations.len(), 7);
        assert_eq!(report.recommendations[0].record_id, "kw-4");
        assert!(report.skipped_rules.is_empty());
    }

    #[tokio::test]
    async fn test_suggestions_surface_bad_rules() {
        let mut rules = default_rules();
        rules[1].action = "TELEPORT".to_string();
        let state = AppState::new(
            Arc::new(CatalogStore::with_demo_data()),
            rules,
            "node-test".to_string(),
        );
        let Json(report) = suggestions(State(state)).await;
        assert_eq!(report.skipped_rule_ids(), vec!["keyword-efficient-raise-bid"]);
        assert_eq!(report.recommendations.len(), 6);
    }

    #[tokio::test]
    async fn test_suggestions_list_rules_rejected_at_load() {
        let set = RuleSet {
            definitions: default_rules(),
            rejected: vec![SkippedRule {
                rule_id: "bad-shape".to_string(),
                reason: "malformed rule entry: invalid type".to_string(),
            }],
        };
        let state = AppState::new(
            Arc::new(CatalogStore::with_demo_data()),
            set,
            "node-test".to_string(),
        );
        let Json(report) = suggestions(State(state.clone())).await;
        assert_eq!(report.skipped_rule_ids(), vec!["bad-shape"]);
        assert_eq!(report.recommendations.len(), 7);

        let Json(definitions) = rules(State(state)).await;
        assert_eq!(definitions.len(), 5);
    }

    #[tokio::test]
    async fn test_apply_leaves_contradictory_record_untouched() {
        let mut definitions = default_rules();
        // Raise every keyword bid, contradicting the high-ACoS rule on kw-1.
        definitions.push(RuleDefinition {
            id: "raise-all".to_string(),
            name: "Raise all".to_string(),
            conditions: vec![ConditionDefinition {
                metric: "SPEND".to_string(),
                comparator: "GT".to_string(),
                threshold: 0.0,
            }],
            action: "INCREASE_BID".to_string(),
            magnitude: 0.1,
            priority: "LOW".to_string(),
            applies_to: "KEYWORD".to_string(),
            potential_impact: None,
        });
        let state = AppState::new(
            Arc::new(CatalogStore::with_demo_data()),
            definitions,
            "node-test".to_string(),
        );

        let Json(report) = suggestions(State(state.clone())).await;
        assert!(report.conflicts.iter().any(|c| c.record_id == "kw-1"));

        let request = ApplyRequest {
            record_ids: Some(vec!["kw-1".to_string()]),
            rule_ids: None,
        };
        let Json(outcome) = apply(State(state.clone()), Some(Json(request))).await;
        assert_eq!(outcome.applied, 0);
        assert_eq!(outcome.skipped.len(), 2);
        assert_eq!(state.catalog.get_keyword("kw-1").unwrap().bid, 1.50);

        // Narrowing to one side resolves the contradiction.
        let request = ApplyRequest {
            record_ids: Some(vec!["kw-1".to_string()]),
            rule_ids: Some(vec!["keyword-high-acos-lower-bid".to_string()]),
        };
        let Json(outcome) = apply(State(state.clone()), Some(Json(request))).await;
        assert_eq!(outcome.applied, 1);
        assert_eq!(state.catalog.get_keyword("kw-1").unwrap().bid, 1.20);
    }

    #[tokio::test]
    async fn test_apply_filtered_by_record() {
        let state = state();
        let request = ApplyRequest {
            record_ids: Some(vec!["kw-2".to_string()]),
            rule_ids: None,
        };
        let Json(outcome) = apply(State(state.clone()), Some(Json(request))).await;
        assert_eq!(outcome.applied, 1);
        assert_eq!(outcome.applied_record_ids, vec!["kw-2"]);
        assert_eq!(state.catalog.get_keyword("kw-2").unwrap().bid, 0.96);

        let Json(entries) = history(State(state)).await;
        assert_eq!(entries[0].rule_id.as_deref(), Some("keyword-high-acos-lower-bid"));
    }

    #[tokio::test]
    async fn test_apply_everything_then_nothing_left_to_pause() {
        let state = state();
        let Json(first) = apply(State(state.clone()), None).await;
        assert_eq!(first.applied, 7);
        assert_eq!(
            state.catalog.get_keyword("kw-4").unwrap().state,
            EntityState::Paused
        );

        // kw-4 is now paused but still trips the pause rule; applying again skips it.
        let request = ApplyRequest {
            record_ids: None,
            rule_ids: Some(vec!["keyword-wasteful-pause".to_string()]),
        };
        let Json(second) = apply(State(state), Some(Json(request))).await;
        assert_eq!(second.applied, 0);
        assert_eq!(second.skipped.len(), 1);
        assert!(!second.success);
    }

    #[tokio::test]
    async fn test_rules_endpoint() {
        let Json(definitions) = rules(State(state())).await;
        assert_eq!(definitions.len(), 5);
        assert_eq!(definitions[0].id, "keyword-wasteful-pause");
    }
}
