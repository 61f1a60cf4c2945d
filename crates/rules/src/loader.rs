//! Loading rule definitions from JSON files.

use std::path::Path;

use bidwise_core::error::{BidwiseError, BidwiseResult};
use tracing::{info, warn};

use crate::engine::SkippedRule;
use crate::rule::RuleDefinition;

/// Rule definitions read from a file, plus the entries that could not be
/// read as definitions at all.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleSet {
    pub definitions: Vec<RuleDefinition>,
    /// Entries dropped at load time; reported with the engine's skipped rules.
    pub rejected: Vec<SkippedRule>,
}

impl RuleSet {
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }
}

impl From<Vec<RuleDefinition>> for RuleSet {
    fn from(definitions: Vec<RuleDefinition>) -> Self {
        Self {
            definitions,
            rejected: Vec::new(),
        }
    }
}

/// Reads a JSON array of rule definitions.
///
/// Entries that do not even have the shape of a rule definition (a string
/// where a number belongs, a missing `action`) end up in
/// [`RuleSet::rejected`]. Entries with unknown metric, comparator or action
/// names are kept; the engine reports them as skipped when it evaluates.
pub fn load_rule_file(path: impl AsRef<Path>) -> BidwiseResult<RuleSet> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path)?;

    let entries: Vec<serde_json::Value> =
        serde_json::from_str(&raw).map_err(|e| BidwiseError::RuleFile {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

    let mut set = RuleSet {
        definitions: Vec::with_capacity(entries.len()),
        rejected: Vec::new(),
    };
    for (index, entry) in entries.into_iter().enumerate() {
        let id = entry
            .get("id")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| format!("<entry {index}>"));
        match serde_json::from_value::<RuleDefinition>(entry) {
            Ok(def) => set.definitions.push(def),
            Err(e) => {
                warn!(
                    path = %path.display(),
                    index,
                    rule_id = %id,
                    error = %e,
                    "Dropping malformed rule entry"
                );
                metrics::counter!("rules.skipped").increment(1);
                set.rejected.push(SkippedRule {
                    rule_id: id,
                    reason: format!("malformed rule entry: {e}"),
                });
            }
        }
    }

    info!(
        path = %path.display(),
        rules = set.definitions.len(),
        rejected = set.rejected.len(),
        "Loaded rule file"
    );
    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_temp(contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("bidwise-rules-{}.json", uuid::Uuid::new_v4()));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_load_valid_file() {
        let path = write_temp(
            r#"[{"id": "r1", "conditions": [{"metric": "ACOS", "comparator": "GT", "threshold": 25}], "action": "DECREASE_BID", "magnitude": 0.2}]"#,
        );
        let set = load_rule_file(&path).unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set.definitions[0].id, "r1");
        assert!(set.rejected.is_empty());
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_malformed_entry_rejected_unknown_names_kept() {
        let path = write_temp(
            r#"[
                {"id": "shape", "conditions": [{"metric": "ACOS", "comparator": "GT", "threshold": "high"}], "action": "PAUSE"},
                {"id": "names", "conditions": [{"metric": "MOOD", "comparator": "GT", "threshold": 1}], "action": "PAUSE"},
                {"id": "no-action", "conditions": [{"metric": "ACOS", "comparator": "GT", "threshold": 1}]},
                {"conditions": []}
            ]"#,
        );
        let set = load_rule_file(&path).unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set.definitions[0].id, "names");

        let rejected: Vec<&str> = set.rejected.iter().map(|r| r.rule_id.as_str()).collect();
        assert_eq!(rejected, vec!["shape", "no-action", "<entry 3>"]);
        assert!(set.rejected[0].reason.starts_with("malformed rule entry"));
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_rejected_entries_reach_the_report() {
        use crate::engine::RecommendationEngine;
        use bidwise_core::types::{EntityState, EntityType, PerformanceRecord};

        let path = write_temp(
            r#"[
                {"id": "bad-shape", "conditions": [{"metric": "ACOS", "comparator": "GT", "threshold": "high"}], "action": "PAUSE"},
                {"id": "bad-enum", "conditions": [{"metric": "MOOD", "comparator": "GT", "threshold": 1}], "action": "PAUSE"},
                {"id": "no-action", "conditions": [{"metric": "ACOS", "comparator": "GT", "threshold": 1}]},
                {"id": "good", "conditions": [{"metric": "ACOS", "comparator": "GT", "threshold": 25}], "action": "DECREASE_BID", "magnitude": 0.2}
            ]"#,
        );
        let set = load_rule_file(&path).unwrap();
        let record = PerformanceRecord {
            id: "kw-1".to_string(),
            entity_type: EntityType::Keyword,
            name: "wireless headphones".to_string(),
            state: EntityState::Enabled,
            bid: Some(1.5),
            budget: None,
            spend: 100.0,
            sales: 200.0,
            clicks: 150,
            impressions: 5000,
            orders: 15,
        };

        let report = RecommendationEngine::new().evaluate_set(&[record], &set);
        assert_eq!(report.recommendations.len(), 1);
        assert_eq!(report.recommendations[0].rule_id, "good");
        assert_eq!(
            report.skipped_rule_ids(),
            vec!["bad-shape", "no-action", "bad-enum"]
        );

        // Rejections are reported even when there is nothing to evaluate.
        let empty = RecommendationEngine::new().evaluate_set(&[], &set);
        assert_eq!(empty.skipped_rules.len(), 3);
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_not_an_array_is_an_error() {
        let path = write_temp(r#"{"id": "r1"}"#);
        let err = load_rule_file(&path).unwrap_err();
        assert!(matches!(err, BidwiseError::RuleFile { .. }));
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = load_rule_file("/nonexistent/bidwise/rules.json").unwrap_err();
        assert!(matches!(err, BidwiseError::Io(_)));
    }
}
