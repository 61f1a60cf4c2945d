//! Campaign and keyword performance records shared by the optimizer, the
//! catalog and the API.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Whether a record describes a campaign or a single keyword.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityType {
    Campaign,
    Keyword,
}

/// Serving state of a campaign or keyword.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityState {
    Enabled,
    Paused,
    Archived,
}

/// One campaign's or keyword's measured performance over a reporting window.
///
/// `clicks <= impressions` and `orders <= clicks` are expected but not
/// enforced; every derived metric stays well-defined when they are violated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PerformanceRecord {
    pub id: String,
    pub entity_type: EntityType,
    pub name: String,
    pub state: EntityState,
    /// Keywords only.
    #[serde(default)]
    pub bid: Option<f64>,
    /// Campaigns only.
    #[serde(default)]
    pub budget: Option<f64>,
    pub spend: f64,
    pub sales: f64,
    #[serde(default)]
    pub clicks: u64,
    #[serde(default)]
    pub impressions: u64,
    #[serde(default)]
    pub orders: u64,
}

impl PerformanceRecord {
    /// Advertising cost of sale in percent. `None` when there were no sales.
    pub fn acos(&self) -> Option<f64> {
        ratio(self.spend, self.sales).map(|r| r * 100.0)
    }

    /// Click-through rate in percent, 0 when there were no impressions.
    pub fn ctr(&self) -> f64 {
        self.ctr_defined().unwrap_or(0.0)
    }

    /// Click-through rate, `None` when there were no impressions.
    pub fn ctr_defined(&self) -> Option<f64> {
        ratio(self.clicks as f64, self.impressions as f64).map(|r| r * 100.0)
    }

    /// Cost per click. `None` without clicks.
    pub fn cpc(&self) -> Option<f64> {
        ratio(self.spend, self.clicks as f64)
    }

    /// Orders per click in percent. `None` without clicks.
    pub fn conversion_rate(&self) -> Option<f64> {
        ratio(self.orders as f64, self.clicks as f64).map(|r| r * 100.0)
    }

    /// Return on ad spend. `None` without spend.
    pub fn roas(&self) -> Option<f64> {
        ratio(self.sales, self.spend)
    }

    /// Share of the budget already spent, in percent. `None` without a
    /// positive budget.
    pub fn budget_utilization(&self) -> Option<f64> {
        self.budget
            .and_then(|budget| ratio(self.spend, budget))
            .map(|r| r * 100.0)
    }

    pub fn is_active(&self) -> bool {
        self.state == EntityState::Enabled
    }
}

fn ratio(numerator: f64, denominator: f64) -> Option<f64> {
    if denominator > 0.0 {
        Some(numerator / denominator)
    } else {
        None
    }
}
