//! Rule model: typed rules, their configuration form, and validation.

use std::fmt;
use std::str::FromStr;

use bidwise_core::types::{EntityType, PerformanceRecord};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Tolerance used by [`Comparator::Eq`].
const EQ_EPSILON: f64 = 1e-9;

// ─── Errors ─────────────────────────────────────────────────────────────────

/// Why a rule definition could not be turned into a [`Rule`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RuleError {
    #[error("rule id must not be empty")]
    EmptyId,

    #[error("duplicate rule id '{0}'")]
    DuplicateId(String),

    #[error("unknown metric '{0}'")]
    UnknownMetric(String),

    #[error("unknown comparator '{0}'")]
    UnknownComparator(String),

    #[error("unknown action '{0}'")]
    UnknownAction(String),

    #[error("unknown priority '{0}'")]
    UnknownPriority(String),

    #[error("unknown entity scope '{0}'")]
    UnknownScope(String),

    #[error("rule has no conditions")]
    NoConditions,

    #[error("threshold for {0} is not a finite number")]
    NonFiniteThreshold(String),

    #[error("magnitude {0} must be a finite, non-negative fraction")]
    InvalidMagnitude(f64),
}

// ─── Metrics ────────────────────────────────────────────────────────────────

/// A raw or derived performance figure a condition can test.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Metric {
    Acos,
    Ctr,
    Cpc,
    ConversionRate,
    Roas,
    BudgetUtilization,
    Spend,
    Sales,
    Clicks,
    Impressions,
    Orders,
    Bid,
    Budget,
}

/// The value of a metric for one record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricValue {
    Value(f64),
    /// A ratio whose denominator is zero (ACoS without sales, CTR without
    /// impressions, ...).
    Undefined,
    /// The record does not carry the field at all (a campaign has no bid).
    Missing,
}

impl Metric {
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Acos => "ACOS",
            Metric::Ctr => "CTR",
            Metric::Cpc => "CPC",
            Metric::ConversionRate => "CONVERSION_RATE",
            Metric::Roas => "ROAS",
            Metric::BudgetUtilization => "BUDGET_UTILIZATION",
            Metric::Spend => "SPEND",
            Metric::Sales => "SALES",
            Metric::Clicks => "CLICKS",
            Metric::Impressions => "IMPRESSIONS",
            Metric::Orders => "ORDERS",
            Metric::Bid => "BID",
            Metric::Budget => "BUDGET",
        }
    }

    /// Human-readable name used in recommendation reasons.
    pub fn label(&self) -> &'static str {
        match self {
            Metric::Acos => "ACoS",
            Metric::Ctr => "CTR",
            Metric::Cpc => "CPC",
            Metric::ConversionRate => "conversion rate",
            Metric::Roas => "ROAS",
            Metric::BudgetUtilization => "budget utilization",
            Metric::Spend => "spend",
            Metric::Sales => "sales",
            Metric::Clicks => "clicks",
            Metric::Impressions => "impressions",
            Metric::Orders => "orders",
            Metric::Bid => "bid",
            Metric::Budget => "budget",
        }
    }

    fn is_percentage(&self) -> bool {
        matches!(
            self,
            Metric::Acos | Metric::Ctr | Metric::ConversionRate | Metric::BudgetUtilization
        )
    }

    /// Reads this metric from a record.
    pub fn resolve(&self, record: &PerformanceRecord) -> MetricValue {
        fn ratio(value: Option<f64>) -> MetricValue {
            value.map_or(MetricValue::Undefined, MetricValue::Value)
        }
        fn field(value: Option<f64>) -> MetricValue {
            value.map_or(MetricValue::Missing, MetricValue::Value)
        }

        match self {
            Metric::Acos => ratio(record.acos()),
            Metric::Ctr => ratio(record.ctr_defined()),
            Metric::Cpc => ratio(record.cpc()),
            Metric::ConversionRate => ratio(record.conversion_rate()),
            Metric::Roas => ratio(record.roas()),
            Metric::BudgetUtilization => match record.budget {
                None => MetricValue::Missing,
                Some(_) => ratio(record.budget_utilization()),
            },
            Metric::Spend => MetricValue::Value(record.spend),
            Metric::Sales => MetricValue::Value(record.sales),
            Metric::Clicks => MetricValue::Value(record.clicks as f64),
            Metric::Impressions => MetricValue::Value(record.impressions as f64),
            Metric::Orders => MetricValue::Value(record.orders as f64),
            Metric::Bid => field(record.bid),
            Metric::Budget => field(record.budget),
        }
    }

    /// Formats a resolved value of this metric for display.
    pub fn format_value(&self, value: MetricValue) -> String {
        match value {
            MetricValue::Value(v) if self.is_percentage() => format!("{v:.2}%"),
            MetricValue::Value(v) => format!("{v:.2}"),
            MetricValue::Undefined => "n/a".to_string(),
            MetricValue::Missing => "missing".to_string(),
        }
    }

    fn format_threshold(&self, threshold: f64) -> String {
        if self.is_percentage() {
            format!("{threshold:.2}%")
        } else {
            format!("{threshold:.2}")
        }
    }
}

impl FromStr for Metric {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ACOS" => Ok(Metric::Acos),
            "CTR" => Ok(Metric::Ctr),
            "CPC" => Ok(Metric::Cpc),
            "CONVERSION_RATE" | "CVR" => Ok(Metric::ConversionRate),
            "ROAS" => Ok(Metric::Roas),
            "BUDGET_UTILIZATION" => Ok(Metric::BudgetUtilization),
            "SPEND" => Ok(Metric::Spend),
            "SALES" => Ok(Metric::Sales),
            "CLICKS" => Ok(Metric::Clicks),
            "IMPRESSIONS" => Ok(Metric::Impressions),
            "ORDERS" => Ok(Metric::Orders),
            "BID" => Ok(Metric::Bid),
            "BUDGET" => Ok(Metric::Budget),
            _ => Err(RuleError::UnknownMetric(s.to_string())),
        }
    }
}

// ─── Comparators ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Comparator {
    Gt,
    Gte,
    Lt,
    Lte,
    Eq,
}

impl Comparator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Comparator::Gt => "GT",
            Comparator::Gte => "GTE",
            Comparator::Lt => "LT",
            Comparator::Lte => "LTE",
            Comparator::Eq => "EQ",
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Comparator::Gt => ">",
            Comparator::Gte => ">=",
            Comparator::Lt => "<",
            Comparator::Lte => "<=",
            Comparator::Eq => "=",
        }
    }

    /// Tests a metric value against a threshold.
    ///
    /// An undefined ratio counts as "perfectly cheap": it never exceeds or
    /// equals a threshold, and it is below any positive one. A missing field
    /// satisfies nothing.
    pub fn matches(&self, value: MetricValue, threshold: f64) -> bool {
        match value {
            MetricValue::Value(v) => match self {
                Comparator::Gt => v > threshold,
                Comparator::Gte => v >= threshold,
                Comparator::Lt => v < threshold,
                Comparator::Lte => v <= threshold,
                Comparator::Eq => (v - threshold).abs() <= EQ_EPSILON,
            },
            MetricValue::Undefined => match self {
                Comparator::Lt | Comparator::Lte => threshold > 0.0,
                Comparator::Gt | Comparator::Gte | Comparator::Eq => false,
            },
            MetricValue::Missing => false,
        }
    }
}

impl FromStr for Comparator {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GT" | ">" => Ok(Comparator::Gt),
            "GTE" | ">=" => Ok(Comparator::Gte),
            "LT" | "<" => Ok(Comparator::Lt),
            "LTE" | "<=" => Ok(Comparator::Lte),
            "EQ" | "=" | "==" => Ok(Comparator::Eq),
            _ => Err(RuleError::UnknownComparator(s.to_string())),
        }
    }
}

// ─── Actions, priorities, scopes ────────────────────────────────────────────

/// What a rule suggests doing to the record it fired on.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleAction {
    IncreaseBid,
    DecreaseBid,
    Pause,
    IncreaseBudget,
    DecreaseBudget,
}

impl RuleAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleAction::IncreaseBid => "INCREASE_BID",
            RuleAction::DecreaseBid => "DECREASE_BID",
            RuleAction::Pause => "PAUSE",
            RuleAction::IncreaseBudget => "INCREASE_BUDGET",
            RuleAction::DecreaseBudget => "DECREASE_BUDGET",
        }
    }

    pub fn is_bid_change(&self) -> bool {
        matches!(self, RuleAction::IncreaseBid | RuleAction::DecreaseBid)
    }

    pub fn is_budget_change(&self) -> bool {
        matches!(self, RuleAction::IncreaseBudget | RuleAction::DecreaseBudget)
    }

    fn is_increase(&self) -> bool {
        matches!(self, RuleAction::IncreaseBid | RuleAction::IncreaseBudget)
    }

    /// Multiplier applied to the current value, `None` for [`RuleAction::Pause`].
    pub fn factor(&self, magnitude: f64) -> Option<f64> {
        match self {
            RuleAction::IncreaseBid | RuleAction::IncreaseBudget => Some(1.0 + magnitude),
            RuleAction::DecreaseBid | RuleAction::DecreaseBudget => Some(1.0 - magnitude),
            RuleAction::Pause => None,
        }
    }

    /// Whether applying both actions to one record would contradict itself:
    /// opposite adjustments of the same value, or pausing while scaling up.
    pub fn conflicts_with(&self, other: &RuleAction) -> bool {
        use RuleAction::*;
        match (self, other) {
            (IncreaseBid, DecreaseBid) | (DecreaseBid, IncreaseBid) => true,
            (IncreaseBudget, DecreaseBudget) | (DecreaseBudget, IncreaseBudget) => true,
            (Pause, a) | (a, Pause) => a.is_increase(),
            _ => false,
        }
    }
}

impl fmt::Display for RuleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RuleAction {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "INCREASE_BID" | "BID_INCREASE" => Ok(RuleAction::IncreaseBid),
            "DECREASE_BID" | "BID_DECREASE" => Ok(RuleAction::DecreaseBid),
            "PAUSE" => Ok(RuleAction::Pause),
            "INCREASE_BUDGET" | "BUDGET_INCREASE" => Ok(RuleAction::IncreaseBudget),
            "DECREASE_BUDGET" | "BUDGET_DECREASE" => Ok(RuleAction::DecreaseBudget),
            _ => Err(RuleError::UnknownAction(s.to_string())),
        }
    }
}

/// Display and tie-break order. Variants are declared so that the derived
/// `Ord` sorts `High` first.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, ToSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "HIGH",
            Priority::Medium => "MEDIUM",
            Priority::Low => "LOW",
        }
    }
}

impl FromStr for Priority {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "HIGH" => Ok(Priority::High),
            "MEDIUM" => Ok(Priority::Medium),
            "LOW" => Ok(Priority::Low),
            _ => Err(RuleError::UnknownPriority(s.to_string())),
        }
    }
}

/// Which kind of record a rule is evaluated against.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppliesTo {
    Campaign,
    Keyword,
    Both,
}

impl AppliesTo {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppliesTo::Campaign => "CAMPAIGN",
            AppliesTo::Keyword => "KEYWORD",
            AppliesTo::Both => "BOTH",
        }
    }

    pub fn matches(&self, entity_type: EntityType) -> bool {
        match self {
            AppliesTo::Both => true,
            AppliesTo::Campaign => entity_type == EntityType::Campaign,
            AppliesTo::Keyword => entity_type == EntityType::Keyword,
        }
    }
}

impl FromStr for AppliesTo {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CAMPAIGN" => Ok(AppliesTo::Campaign),
            "KEYWORD" => Ok(AppliesTo::Keyword),
            "BOTH" => Ok(AppliesTo::Both),
            _ => Err(RuleError::UnknownScope(s.to_string())),
        }
    }
}

// ─── Typed rules ────────────────────────────────────────────────────────────

/// One guard of a rule: `metric comparator threshold`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub metric: Metric,
    pub comparator: Comparator,
    pub threshold: f64,
}

impl Condition {
    pub fn new(metric: Metric, comparator: Comparator, threshold: f64) -> Self {
        Self {
            metric,
            comparator,
            threshold,
        }
    }

    pub fn holds(&self, record: &PerformanceRecord) -> bool {
        self.comparator
            .matches(self.metric.resolve(record), self.threshold)
    }

    /// e.g. `ACoS 50.00% > 25.00%`
    pub fn describe(&self, record: &PerformanceRecord) -> String {
        format!(
            "{} {} {} {}",
            self.metric.label(),
            self.metric.format_value(self.metric.resolve(record)),
            self.comparator.symbol(),
            self.metric.format_threshold(self.threshold),
        )
    }
}

/// A validated threshold policy. All conditions must hold for the rule to fire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub id: String,
    pub name: String,
    pub conditions: Vec<Condition>,
    pub action: RuleAction,
    pub magnitude: f64,
    pub priority: Priority,
    pub applies_to: AppliesTo,
    /// Free-text expected effect, e.g. "+15% sales".
    pub potential_impact: Option<String>,
}

impl Rule {
    pub fn applies_to_record(&self, record: &PerformanceRecord) -> bool {
        self.applies_to.matches(record.entity_type)
    }

    /// True when every guard condition holds for the record.
    pub fn fires(&self, record: &PerformanceRecord) -> bool {
        !self.conditions.is_empty() && self.conditions.iter().all(|c| c.holds(record))
    }
}

// ─── Configuration form ─────────────────────────────────────────────────────

/// A condition as written in configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ConditionDefinition {
    pub metric: String,
    pub comparator: String,
    pub threshold: f64,
}

/// A rule as written in configuration, before validation. Enum-valued fields
/// are plain strings so that one bad rule can be rejected on its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RuleDefinition {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub conditions: Vec<ConditionDefinition>,
    pub action: String,
    #[serde(default)]
    pub magnitude: f64,
    #[serde(default = "default_priority")]
    pub priority: String,
    #[serde(default = "default_applies_to")]
    pub applies_to: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub potential_impact: Option<String>,
}

fn default_priority() -> String {
    "MEDIUM".to_string()
}

fn default_applies_to() -> String {
    "BOTH".to_string()
}

impl TryFrom<&ConditionDefinition> for Condition {
    type Error = RuleError;

    fn try_from(def: &ConditionDefinition) -> Result<Self, Self::Error> {
        let metric: Metric = def.metric.parse()?;
        let comparator: Comparator = def.comparator.parse()?;
        if !def.threshold.is_finite() {
            return Err(RuleError::NonFiniteThreshold(metric.as_str().to_string()));
        }
        Ok(Condition::new(metric, comparator, def.threshold))
    }
}

impl TryFrom<&RuleDefinition> for Rule {
    type Error = RuleError;

    fn try_from(def: &RuleDefinition) -> Result<Self, Self::Error> {
        if def.id.trim().is_empty() {
            return Err(RuleError::EmptyId);
        }
        if def.conditions.is_empty() {
            return Err(RuleError::NoConditions);
        }
        let conditions = def
            .conditions
            .iter()
            .map(Condition::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        let action: RuleAction = def.action.parse()?;
        if !def.magnitude.is_finite() || def.magnitude < 0.0 {
            return Err(RuleError::InvalidMagnitude(def.magnitude));
        }

        Ok(Rule {
            id: def.id.clone(),
            name: if def.name.is_empty() {
                def.id.clone()
            } else {
                def.name.clone()
            },
            conditions,
            action,
            magnitude: def.magnitude,
            priority: def.priority.parse()?,
            applies_to: def.applies_to.parse()?,
            potential_impact: def.potential_impact.clone(),
        })
    }
}

impl From<&Rule> for RuleDefinition {
    fn from(rule: &Rule) -> Self {
        RuleDefinition {
            id: rule.id.clone(),
            name: rule.name.clone(),
            conditions: rule
                .conditions
                .iter()
                .map(|c| ConditionDefinition {
                    metric: c.metric.as_str().to_string(),
                    comparator: c.comparator.as_str().to_string(),
                    threshold: c.threshold,
                })
                .collect(),
            action: rule.action.as_str().to_string(),
            magnitude: rule.magnitude,
            priority: rule.priority.as_str().to_string(),
            applies_to: rule.applies_to.as_str().to_string(),
            potential_impact: rule.potential_impact.clone(),
        }
    }
}
