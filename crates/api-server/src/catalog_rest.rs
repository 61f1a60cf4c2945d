//! Campaign and keyword REST API endpoints.

use axum::extract::{Path, State};
use axum::Json;
use bidwise_catalog::models::{Campaign, CampaignStats, Keyword, KeywordPerformance};
use serde::Serialize;
use utoipa::ToSchema;

use crate::rest::{api_error, ApiError, AppState, ErrorResponse};

/// A campaign together with its derived metrics.
#[derive(Debug, Serialize, ToSchema)]
pub struct CampaignView {
    #[serde(flatten)]
    pub campaign: Campaign,
    pub acos: Option<f64>,
    pub ctr: f64,
    pub budget_utilization: Option<f64>,
}

impl From<Campaign> for CampaignView {
    fn from(campaign: Campaign) -> Self {
        let record = campaign.to_record();
        Self {
            acos: record.acos(),
            ctr: record.ctr(),
            budget_utilization: record.budget_utilization(),
            campaign,
        }
    }
}

/// A keyword together with its derived metrics.
#[derive(Debug, Serialize, ToSchema)]
pub struct KeywordView {
    #[serde(flatten)]
    pub keyword: Keyword,
    pub acos: Option<f64>,
    pub ctr: f64,
    pub cpc: Option<f64>,
}

impl From<Keyword> for KeywordView {
    fn from(keyword: Keyword) -> Self {
        let record = keyword.to_record();
        Self {
            acos: record.acos(),
            ctr: record.ctr(),
            cpc: record.cpc(),
            keyword,
        }
    }
}

/// GET /v1/campaigns — All campaigns.
#[utoipa::path(
    get,
    path = "/v1/campaigns",
    tag = "Campaigns",
    responses((status = 200, description = "Campaign list", body = [CampaignView]))
)]
pub async fn list_campaigns(State(state): State<AppState>) -> Json<Vec<CampaignView>> {
    Json(
        state
            .catalog
            .campaigns()
            .into_iter()
            .map(CampaignView::from)
            .collect(),
    )
}

/// GET /v1/campaigns/stats — Account-wide campaign totals.
#[utoipa::path(
    get,
    path = "/v1/campaigns/stats",
    tag = "Campaigns",
    responses((status = 200, description = "Campaign totals", body = CampaignStats))
)]
pub async fn campaign_stats(State(state): State<AppState>) -> Json<CampaignStats> {
    Json(state.catalog.campaign_stats())
}

/// GET /v1/campaigns/:id — A single campaign.
#[utoipa::path(
    get,
    path = "/v1/campaigns/{id}",
    tag = "Campaigns",
    params(("id" = String, Path, description = "Campaign id")),
    responses(
        (status = 200, description = "Campaign", body = CampaignView),
        (status = 404, description = "Unknown campaign", body = ErrorResponse),
    )
)]
pub async fn get_campaign(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CampaignView>, ApiError> {
    state
        .catalog
        .get_campaign(&id)
        .map(|c| Json(c.into()))
        .map_err(api_error)
}

/// GET /v1/keywords — All keywords.
#[utoipa::path(
    get,
    path = "/v1/keywords",
    tag = "Keywords",
    responses((status = 200, description = "Keyword list", body = [KeywordView]))
)]
pub async fn list_keywords(State(state): State<AppState>) -> Json<Vec<KeywordView>> {
    Json(
        state
            .catalog
            .keywords()
            .into_iter()
            .map(KeywordView::from)
            .collect(),
    )
}

/// GET /v1/keywords/performance — Keyword totals and averages.
#[utoipa::path(
    get,
    path = "/v1/keywords/performance",
    tag = "Keywords",
    responses((status = 200, description = "Keyword performance", body = KeywordPerformance))
)]
pub async fn keyword_performance(State(state): State<AppState>) -> Json<KeywordPerformance> {
    Json(state.catalog.keyword_performance())
}

/// GET /v1/keywords/:id — A single keyword.
#[utoipa::path(
    get,
    path = "/v1/keywords/{id}",
    tag = "Keywords",
    params(("id" = String, Path, description = "Keyword id")),
    responses(
        (status = 200, description = "Keyword", body = KeywordView),
        (status = 404, description = "Unknown keyword", body = ErrorResponse),
    )
)]
pub async fn get_keyword(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<KeywordView>, ApiError> {
    state
        .catalog
        .get_keyword(&id)
        .map(|k| Json(k.into()))
        .map_err(api_error)
}
