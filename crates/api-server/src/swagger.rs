//! OpenAPI specification.

use axum::Json;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Bidwise API",
        version = "0.1.0",
        description = "Sponsored ads optimization service.\n\nServes campaign and keyword performance, evaluates bid/budget rules into ranked recommendations, and applies them.",
        license(name = "MIT"),
    ),
    tags(
        (name = "Campaigns", description = "Campaign listings and account totals"),
        (name = "Keywords", description = "Keyword listings and performance"),
        (name = "Optimization", description = "Rule-based bid and budget recommendations"),
        (name = "Operations", description = "Health, readiness, and liveness probes"),
    ),
    paths(
        // Campaigns
        crate::catalog_rest::list_campaigns,
        crate::catalog_rest::campaign_stats,
        crate::catalog_rest::get_campaign,
        // Keywords
        crate::catalog_rest::list_keywords,
        crate::catalog_rest::keyword_performance,
        crate::catalog_rest::get_keyword,
        // Optimization
        crate::optimization_rest::suggestions,
        crate::optimization_rest::rules,
        crate::optimization_rest::history,
        crate::optimization_rest::apply,
        // Operations
        crate::rest::health_check,
        crate::rest::readiness,
        crate::rest::liveness,
    ),
    components(schemas(
        // Core types
        bidwise_core::types::EntityType,
        bidwise_core::types::EntityState,
        bidwise_core::types::PerformanceRecord,
        // Catalog types
        bidwise_catalog::models::Campaign,
        bidwise_catalog::models::Keyword,
        bidwise_catalog::models::MatchType,
        bidwise_catalog::models::CampaignStats,
        bidwise_catalog::models::KeywordPerformance,
        bidwise_catalog::models::HistoryEntry,
        bidwise_catalog::models::ApplyOutcome,
        bidwise_catalog::models::SkippedApplication,
        crate::catalog_rest::CampaignView,
        crate::catalog_rest::KeywordView,
        // Optimization types
        bidwise_rules::RuleDefinition,
        bidwise_rules::ConditionDefinition,
        bidwise_rules::Recommendation,
        bidwise_rules::RuleAction,
        bidwise_rules::Priority,
        bidwise_rules::EvaluationReport,
        bidwise_rules::SkippedRule,
        bidwise_rules::Conflict,
        crate::optimization_rest::ApplyRequest,
        // REST error/health types
        crate::rest::ErrorResponse,
        crate::rest::HealthResponse,
    ))
)]
pub struct ApiDoc;

/// GET /api-docs/openapi.json — The OpenAPI document.
pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_optimization_paths() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/v1/optimization/suggestions"));
        assert!(doc.paths.paths.contains_key("/v1/keywords/{id}"));
        assert_eq!(doc.info.title, "Bidwise API");
    }
}
