//! Catalog domain types — campaigns, keywords, aggregate stats, history.

use bidwise_core::types::{EntityState, EntityType, PerformanceRecord};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

// ─── Campaign ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Campaign {
    pub id: String,
    pub name: String,
    pub state: EntityState,
    pub budget: f64,
    pub spend: f64,
    pub sales: f64,
    pub impressions: u64,
    pub clicks: u64,
    pub orders: u64,
}

impl Campaign {
    pub fn to_record(&self) -> PerformanceRecord {
        PerformanceRecord {
            id: self.id.clone(),
            entity_type: EntityType::Campaign,
            name: self.name.clone(),
            state: self.state,
            bid: None,
            budget: Some(self.budget),
            spend: self.spend,
            sales: self.sales,
            clicks: self.clicks,
            impressions: self.impressions,
            orders: self.orders,
        }
    }
}

// ─── Keyword ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchType {
    Broad,
    Phrase,
    Exact,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Keyword {
    pub id: String,
    pub keyword: String,
    pub campaign_id: String,
    pub campaign_name: String,
    pub match_type: MatchType,
    pub state: EntityState,
    pub bid: f64,
    pub spend: f64,
    pub sales: f64,
    pub impressions: u64,
    pub clicks: u64,
    pub orders: u64,
}

impl Keyword {
    pub fn to_record(&self) -> PerformanceRecord {
        PerformanceRecord {
            id: self.id.clone(),
            entity_type: EntityType::Keyword,
            name: self.keyword.clone(),
            state: self.state,
            bid: Some(self.bid),
            budget: None,
            spend: self.spend,
            sales: self.sales,
            clicks: self.clicks,
            impressions: self.impressions,
            orders: self.orders,
        }
    }
}

// ─── Aggregates ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CampaignStats {
    pub total_campaigns: usize,
    pub active_campaigns: usize,
    pub total_budget: f64,
    pub total_spend: f64,
    pub total_clicks: u64,
    pub total_orders: u64,
    pub total_sales: f64,
    /// `None` when nothing sold.
    pub overall_acos: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct KeywordPerformance {
    pub total_keywords: usize,
    pub active_keywords: usize,
    /// Averages skip keywords whose metric is undefined; `None` when every
    /// keyword was skipped.
    pub avg_ctr: Option<f64>,
    pub avg_cpc: Option<f64>,
    pub avg_acos: Option<f64>,
    pub total_clicks: u64,
    pub total_orders: u64,
}

// ─── History / apply ───────────────────────────────────────────────────────

/// One change made to the catalog by the optimization workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct HistoryEntry {
    pub id: Uuid,
    pub date: DateTime<Utc>,
    pub record_id: Option<String>,
    pub rule_id: Option<String>,
    pub action: String,
    pub from: Option<f64>,
    pub to: Option<f64>,
    /// Observed impact, filled in for historical entries only.
    pub result: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SkippedApplication {
    pub record_id: String,
    pub rule_id: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ApplyOutcome {
    pub success: bool,
    pub message: String,
    pub applied: usize,
    pub applied_record_ids: Vec<String>,
    pub skipped: Vec<SkippedApplication>,
}
