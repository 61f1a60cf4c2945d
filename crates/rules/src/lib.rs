//! Bid and budget optimization rules — declarative threshold policies over
//! campaign/keyword performance and the engine that turns them into ranked
//! recommendations.

pub mod defaults;
pub mod engine;
pub mod loader;
pub mod rule;

pub use defaults::default_rules;
pub use engine::{
    Conflict, EvaluationReport, Recommendation, RecommendationEngine, SkippedRule,
    MIN_SUGGESTED_VALUE,
};
pub use loader::{load_rule_file, RuleSet};
pub use rule::{
    AppliesTo, Comparator, Condition, ConditionDefinition, Metric, MetricValue, Priority, Rule,
    RuleAction, RuleDefinition, RuleError,
};
