//! API server — builds the router and runs the HTTP and metrics listeners.

use crate::rest::{self, AppState};
use crate::{catalog_rest, optimization_rest, swagger};
use axum::routing::{get, post};
use axum::Router;
use bidwise_catalog::CatalogStore;
use bidwise_core::config::AppConfig;
use bidwise_rules::RuleSet;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Build the application router with all endpoints and middleware.
pub fn router(state: AppState) -> Router {
    Router::new()
        // Campaigns
        .route("/v1/campaigns", get(catalog_rest::list_campaigns))
        .route("/v1/campaigns/stats", get(catalog_rest::campaign_stats))
        .route("/v1/campaigns/:id", get(catalog_rest::get_campaign))
        // Keywords
        .route("/v1/keywords", get(catalog_rest::list_keywords))
        .route("/v1/keywords/performance", get(catalog_rest::keyword_performance))
        .route("/v1/keywords/:id", get(catalog_rest::get_keyword))
        // Optimization
        .route("/v1/optimization/suggestions", get(optimization_rest::suggestions))
        .route("/v1/optimization/rules", get(optimization_rest::rules))
        .route("/v1/optimization/history", get(optimization_rest::history))
        .route("/v1/optimization/apply", post(optimization_rest::apply))
        // Operational endpoints
        .route("/health", get(rest::health_check))
        .route("/ready", get(rest::readiness))
        .route("/live", get(rest::liveness))
        .route("/api-docs/openapi.json", get(swagger::openapi_json))
        // Middleware
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Main API server.
pub struct ApiServer {
    config: AppConfig,
    catalog: Arc<CatalogStore>,
    rules: RuleSet,
}

impl ApiServer {
    pub fn new(config: AppConfig, catalog: Arc<CatalogStore>, rules: RuleSet) -> Self {
        Self {
            config,
            catalog,
            rules,
        }
    }

    /// Start the HTTP REST server.
    pub async fn start_http(&self) -> anyhow::Result<()> {
        let state = AppState::new(
            self.catalog.clone(),
            self.rules.clone(),
            self.config.node_id.clone(),
        );
        let app = router(state);

        let addr = SocketAddr::new(self.config.api.host.parse()?, self.config.api.http_port);

        info!(addr = %addr, rules = self.rules.len(), "Starting HTTP server");

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }

    /// Start the Prometheus exporter on a separate port. Must run inside the
    /// tokio runtime.
    pub async fn start_metrics(&self) -> anyhow::Result<()> {
        if !self.config.metrics.enabled {
            info!("Metrics exporter disabled");
            return Ok(());
        }

        metrics_exporter_prometheus::PrometheusBuilder::new()
            .with_http_listener(SocketAddr::new(
                self.config.api.host.parse()?,
                self.config.metrics.port,
            ))
            .install()?;

        info!(port = self.config.metrics.port, "Metrics exporter started");
        Ok(())
    }
}
