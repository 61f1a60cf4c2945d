//! Shared REST state, error body, and operational endpoints.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use bidwise_catalog::CatalogStore;
use bidwise_core::error::BidwiseError;
use bidwise_rules::{RecommendationEngine, RuleSet};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use utoipa::ToSchema;

/// Shared application state for REST handlers.
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<CatalogStore>,
    pub engine: RecommendationEngine,
    pub rules: Arc<RuleSet>,
    pub node_id: String,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(catalog: Arc<CatalogStore>, rules: impl Into<RuleSet>, node_id: String) -> Self {
        Self {
            catalog,
            engine: RecommendationEngine::new(),
            rules: Arc::new(rules.into()),
            node_id,
            start_time: Instant::now(),
        }
    }
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

/// Maps a domain error onto an HTTP status and error body.
pub fn api_error(err: BidwiseError) -> ApiError {
    let (status, code) = match &err {
        BidwiseError::RecordNotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
    };
    (
        status,
        Json(ErrorResponse {
            error: code.to_string(),
            message: err.to_string(),
        }),
    )
}

/// GET /health — Health check endpoint.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Operations",
    responses((status = 200, description = "Service health", body = HealthResponse))
)]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        node_id: state.node_id.clone(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        rules_loaded: state.rules.len(),
    })
}

/// GET /ready — Readiness probe. Ready once at least one rule is loaded.
#[utoipa::path(
    get,
    path = "/ready",
    tag = "Operations",
    responses(
        (status = 200, description = "Ready"),
        (status = 503, description = "No rules loaded"),
    )
)]
pub async fn readiness(State(state): State<AppState>) -> StatusCode {
    if state.rules.is_empty() {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    }
}

/// GET /live — Liveness probe.
#[utoipa::path(
    get,
    path = "/live",
    tag = "Operations",
    responses((status = 200, description = "Alive"))
)]
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub node_id: String,
    pub uptime_secs: u64,
    pub rules_loaded: usize,
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> axum::response::Response {
        (StatusCode::INTERNAL_SERVER_ERROR, Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bidwise_rules::{default_rules, RuleDefinition};

    fn state(rules: Vec<RuleDefinition>) -> AppState {
        AppState::new(
            Arc::new(CatalogStore::with_demo_data()),
            rules,
            "node-test".to_string(),
        )
    }

    #[tokio::test]
    async fn test_health_reports_rules() {
        let Json(health) = health_check(State(state(default_rules()))).await;
        assert_eq!(health.status, "healthy");
        assert_eq!(health.node_id, "node-test");
        assert_eq!(health.rules_loaded, 5);
    }

    #[tokio::test]
    async fn test_readiness_requires_rules() {
        assert_eq!(readiness(State(state(default_rules()))).await, StatusCode::OK);
        assert_eq!(
            readiness(State(state(Vec::new()))).await,
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_not_found_maps_to_404() {
        let (status, Json(body)) = api_error(BidwiseError::RecordNotFound("kw-9".to_string()));
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.error, "not_found");
    }
}
