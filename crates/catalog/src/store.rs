//! In-memory catalog store guarded by `parking_lot` locks.
//!
//! Vectors keep seed order so that listings and evaluation runs are
//! deterministic.

use bidwise_core::error::{BidwiseError, BidwiseResult};
use bidwise_core::types::{EntityState, PerformanceRecord};
use bidwise_rules::{Recommendation, RuleAction};
use chrono::{NaiveDate, Utc};
use parking_lot::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::*;

/// Thread-safe store for campaigns, keywords and optimization history.
pub struct CatalogStore {
    campaigns: RwLock<Vec<Campaign>>,
    keywords: RwLock<Vec<Keyword>>,
    history: RwLock<Vec<HistoryEntry>>,
}

impl CatalogStore {
    /// An empty store.
    pub fn new() -> Self {
        Self {
            campaigns: RwLock::new(Vec::new()),
            keywords: RwLock::new(Vec::new()),
            history: RwLock::new(Vec::new()),
        }
    }

    /// A store seeded with the demo account.
    pub fn with_demo_data() -> Self {
        let store = Self::new();
        store.seed_demo_data();
        info!(
            campaigns = store.campaigns.read().len(),
            keywords = store.keywords.read().len(),
            "Catalog store initialized (in-memory, demo data)"
        );
        store
    }

    pub fn insert_campaign(&self, campaign: Campaign) {
        self.campaigns.write().push(campaign);
    }

    pub fn insert_keyword(&self, keyword: Keyword) {
        self.keywords.write().push(keyword);
    }

    // ─── Campaigns ─────────────────────────────────────────────────────────

    pub fn campaigns(&self) -> Vec<Campaign> {
        self.campaigns.read().clone()
    }

    pub fn get_campaign(&self, id: &str) -> BidwiseResult<Campaign> {
        self.campaigns
            .read()
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or_else(|| BidwiseError::RecordNotFound(id.to_string()))
    }

    pub fn campaign_stats(&self) -> CampaignStats {
        let campaigns = self.campaigns.read();
        let total_spend: f64 = campaigns.iter().map(|c| c.spend).sum();
        let total_sales: f64 = campaigns.iter().map(|c| c.sales).sum();

        CampaignStats {
            total_campaigns: campaigns.len(),
            active_campaigns: campaigns
                .iter()
                .filter(|c| c.state == EntityState::Enabled)
                .count(),
            total_budget: campaigns.iter().map(|c| c.budget).sum(),
            total_spend,
            total_clicks: campaigns.iter().map(|c| c.clicks).sum(),
            total_orders: campaigns.iter().map(|c| c.orders).sum(),
            total_sales,
            overall_acos: (total_sales > 0.0).then(|| total_spend / total_sales * 100.0),
        }
    }

    // ─── Keywords ──────────────────────────────────────────────────────────

    pub fn keywords(&self) -> Vec<Keyword> {
        self.keywords.read().clone()
    }

    pub fn get_keyword(&self, id: &str) -> BidwiseResult<Keyword> {
        self.keywords
            .read()
            .iter()
            .find(|k| k.id == id)
            .cloned()
            .ok_or_else(|| BidwiseError::RecordNotFound(id.to_string()))
    }

    pub fn keyword_performance(&self) -> KeywordPerformance {
        let records: Vec<PerformanceRecord> =
            self.keywords.read().iter().map(Keyword::to_record).collect();

        KeywordPerformance {
            total_keywords: records.len(),
            active_keywords: records.iter().filter(|r| r.is_active()).count(),
            avg_ctr: mean(records.iter().filter_map(|r| r.ctr_defined())),
            avg_cpc: mean(records.iter().filter_map(|r| r.cpc())),
            avg_acos: mean(records.iter().filter_map(|r| r.acos())),
            total_clicks: records.iter().map(|r| r.clicks).sum(),
            total_orders: records.iter().map(|r| r.orders).sum(),
        }
    }

    // ─── Optimization ──────────────────────────────────────────────────────

    /// Every campaign followed by every keyword, as engine input.
    pub fn records(&self) -> Vec<PerformanceRecord> {
        let mut records: Vec<PerformanceRecord> =
            self.campaigns.read().iter().map(Campaign::to_record).collect();
        records.extend(self.keywords.read().iter().map(Keyword::to_record));
        records
    }

    /// Optimization history, newest first.
    pub fn history(&self) -> Vec<HistoryEntry> {
        self.history.read().clone()
    }

    /// Applies recommendations to the catalog: bid and budget changes take the
    /// suggested value, pauses move the entity to `PAUSED`. Each applied
    /// change is logged to the history. Recommendations that cannot be applied
    /// are reported back, not treated as errors. Contradictory pairs for one
    /// record (bid up and down, pause and raise) are both skipped; callers pick
    /// a side by filtering the selection.
    pub fn apply(&self, recommendations: &[Recommendation]) -> ApplyOutcome {
        let mut campaigns = self.campaigns.write();
        let mut keywords = self.keywords.write();
        let mut history = self.history.write();

        let mut applied_record_ids = Vec::new();
        let mut skipped = Vec::new();

        let contradicted = contradictory(recommendations);
        for (rec, conflicted) in recommendations.iter().zip(contradicted) {
            let change = if conflicted {
                Err("contradicts another selected recommendation for this record".to_string())
            } else if let Some(kw) = keywords.iter_mut().find(|k| k.id == rec.record_id) {
                apply_to_keyword(kw, rec)
            } else if let Some(c) = campaigns.iter_mut().find(|c| c.id == rec.record_id) {
                apply_to_campaign(c, rec)
            } else {
                Err("unknown record".to_string())
            };

            match change {
                Ok((action, from, to)) => {
                    history.insert(
                        0,
                        HistoryEntry {
                            id: Uuid::new_v4(),
                            date: Utc::now(),
                            record_id: Some(rec.record_id.clone()),
                            rule_id: Some(rec.rule_id.clone()),
                            action,
                            from,
                            to,
                            result: None,
                        },
                    );
                    applied_record_ids.push(rec.record_id.clone());
                }
                Err(reason) => {
                    warn!(
                        record_id = %rec.record_id,
                        rule_id = %rec.rule_id,
                        reason = %reason,
                        "Recommendation not applied"
                    );
                    skipped.push(SkippedApplication {
                        record_id: rec.record_id.clone(),
                        rule_id: rec.rule_id.clone(),
                        reason,
                    });
                }
            }
        }

        let applied = applied_record_ids.len();
        info!(applied, skipped = skipped.len(), "Optimizations applied");

        ApplyOutcome {
            success: skipped.is_empty(),
            message: if applied == 0 && skipped.is_empty() {
                "No optimizations to apply".to_string()
            } else {
                format!("{applied} optimizations applied, {} skipped", skipped.len())
            },
            applied,
            applied_record_ids,
            skipped,
        }
    }

    // ─── Seed data ─────────────────────────────────────────────────────────

    fn seed_demo_data(&self) {
        let campaigns = vec![
            ("camp-1", "Winter Sale 2025", EntityState::Enabled, 1000.0, 750.0, 2250.0, 15_000, 450, 45),
            ("camp-2", "Spring Collection", EntityState::Enabled, 800.0, 520.0, 1900.0, 12_000, 380, 38),
            ("camp-3", "Summer Clearance", EntityState::Enabled, 500.0, 480.0, 2000.0, 9_000, 300, 40),
            ("camp-4", "Gadget Launch", EntityState::Paused, 600.0, 420.0, 600.0, 7_500, 210, 9),
        ];
        for (id, name, state, budget, spend, sales, impressions, clicks, orders) in campaigns {
            self.insert_campaign(Campaign {
                id: id.to_string(),
                name: name.to_string(),
                state,
                budget,
                spend,
                sales,
                impressions,
                clicks,
                orders,
            });
        }

        let keywords = vec![
            ("kw-1", "wireless headphones", "camp-1", MatchType::Broad, EntityState::Enabled, 1.50, 142.50, 452.38, 5_000, 150, 15),
            ("kw-2", "bluetooth speaker", "camp-2", MatchType::Phrase, EntityState::Enabled, 1.20, 110.88, 378.43, 4_200, 126, 12),
            ("kw-3", "noise cancelling earbuds", "camp-1", MatchType::Exact, EntityState::Enabled, 0.85, 98.00, 720.00, 3_800, 140, 18),
            ("kw-4", "expensive item", "camp-2", MatchType::Broad, EntityState::Enabled, 2.10, 147.00, 95.00, 2_600, 70, 2),
            ("kw-5", "usb c cable", "camp-3", MatchType::Exact, EntityState::Paused, 0.40, 0.0, 0.0, 0, 0, 0),
        ];
        for (id, keyword, campaign_id, match_type, state, bid, spend, sales, impressions, clicks, orders) in keywords {
            let campaign_name = self
                .get_campaign(campaign_id)
                .map(|c| c.name)
                .unwrap_or_default();
            self.insert_keyword(Keyword {
                id: id.to_string(),
                keyword: keyword.to_string(),
                campaign_id: campaign_id.to_string(),
                campaign_name,
                match_type,
                state,
                bid,
                spend,
                sales,
                impressions,
                clicks,
                orders,
            });
        }

        let history = vec![
            ((2025, 11, 14), "Bid increased for \"wireless headphones\"", Some("kw-1"), Some(1.50), Some(1.75), "+12% sales"),
            ((2025, 11, 13), "Paused keyword \"expensive item\"", None, None, None, "-$50 wasted spend"),
        ];
        let mut log = self.history.write();
        for ((y, m, d), action, record_id, from, to, result) in history {
            let Some(date) = NaiveDate::from_ymd_opt(y, m, d)
                .and_then(|day| day.and_hms_opt(0, 0, 0))
                .map(|dt| dt.and_utc())
            else {
                continue;
            };
            log.push(HistoryEntry {
                id: Uuid::new_v4(),
                date,
                record_id: record_id.map(str::to_string),
                rule_id: None,
                action: action.to_string(),
                from,
                to,
                result: Some(result.to_string()),
            });
        }
    }
}

impl Default for CatalogStore {
    fn default() -> Self {
        Self::new()
    }
}

type Change = Result<(String, Option<f64>, Option<f64>), String>;

/// Flags every recommendation that contradicts another one for the same
/// record. Neither side of such a pair is applied.
fn contradictory(recommendations: &[Recommendation]) -> Vec<bool> {
    let mut hit = vec![false; recommendations.len()];
    for i in 0..recommendations.len() {
        for j in (i + 1)..recommendations.len() {
            let (a, b) = (&recommendations[i], &recommendations[j]);
            if a.record_id == b.record_id && a.action.conflicts_with(&b.action) {
                hit[i] = true;
                hit[j] = true;
            }
        }
    }
    hit
}

fn apply_to_keyword(kw: &mut Keyword, rec: &Recommendation) -> Change {
    if kw.state == EntityState::Archived {
        return Err("keyword is archived".to_string());
    }
    match rec.action {
        RuleAction::IncreaseBid | RuleAction::DecreaseBid => {
            let to = rec
                .suggested_value
                .ok_or_else(|| "no suggested bid".to_string())?;
            let from = kw.bid;
            kw.bid = to;
            let verb = if rec.action == RuleAction::IncreaseBid {
                "increased"
            } else {
                "decreased"
            };
            Ok((format!("Bid {verb} for \"{}\"", kw.keyword), Some(from), Some(to)))
        }
        RuleAction::Pause => {
            if kw.state == EntityState::Paused {
                return Err("keyword is already paused".to_string());
            }
            kw.state = EntityState::Paused;
            Ok((format!("Paused keyword \"{}\"", kw.keyword), None, None))
        }
        RuleAction::IncreaseBudget | RuleAction::DecreaseBudget => {
            Err("keywords have no budget".to_string())
        }
    }
}

fn apply_to_campaign(c: &mut Campaign, rec: &Recommendation) -> Change {
    if c.state == EntityState::Archived {
        return Err("campaign is archived".to_string());
    }
    match rec.action {
        RuleAction::IncreaseBudget | RuleAction::DecreaseBudget => {
            let to = rec
                .suggested_value
                .ok_or_else(|| "no suggested budget".to_string())?;
            let from = c.budget;
            c.budget = to;
            let verb = if rec.action == RuleAction::IncreaseBudget {
                "increased"
            } else {
                "decreased"
            };
            Ok((format!("Budget {verb} for campaign \"{}\"", c.name), Some(from), Some(to)))
        }
        RuleAction::Pause => {
            if c.state == EntityState::Paused {
                return Err("campaign is already paused".to_string());
            }
            c.state = EntityState::Paused;
            Ok((format!("Paused campaign \"{}\"", c.name), None, None))
        }
        RuleAction::IncreaseBid | RuleAction::DecreaseBid => {
            Err("campaigns have no bid".to_string())
        }
    }
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
    (count > 0).then(|| sum / count as f64)
}
