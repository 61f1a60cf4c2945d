//! Bidwise — rule-based bid and budget optimization for sponsored ads.
//!
//! Main entry point: serves the REST API over the demo catalog, or evaluates
//! a records file once and prints the report.

use anyhow::Context;
use bidwise_api::ApiServer;
use bidwise_catalog::CatalogStore;
use bidwise_core::config::AppConfig;
use bidwise_core::types::PerformanceRecord;
use bidwise_rules::{default_rules, load_rule_file, RecommendationEngine, RuleSet};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "bidwise")]
#[command(about = "Rule-based bid and budget optimization for sponsored ads")]
#[command(version)]
struct Cli {
    /// Rule file (JSON array of rule definitions); overrides config
    #[arg(long, global = true, env = "BIDWISE__OPTIMIZER__RULES_PATH")]
    rules: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the REST API (default)
    Serve {
        /// Node identifier (overrides config)
        #[arg(long, env = "BIDWISE__NODE_ID")]
        node_id: Option<String>,

        /// HTTP port (overrides config)
        #[arg(long, env = "BIDWISE__API__HTTP_PORT")]
        http_port: Option<u16>,
    },
    /// Evaluate a JSON array of performance records and print the report
    Evaluate {
        /// Records file
        #[arg(long)]
        records: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bidwise=info,tower_http=info".into()),
        )
        .json()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Load configuration
    let mut config = AppConfig::load().unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        AppConfig::default()
    });

    if let Some(path) = &cli.rules {
        config.optimizer.rules_path = Some(path.display().to_string());
    }

    let rules = load_rules(&config);

    match cli.command.unwrap_or(Command::Serve {
        node_id: None,
        http_port: None,
    }) {
        Command::Serve { node_id, http_port } => {
            if let Some(node_id) = node_id {
                config.node_id = node_id;
            }
            if let Some(port) = http_port {
                config.api.http_port = port;
            }
            serve(config, rules).await
        }
        Command::Evaluate { records } => evaluate(&records, &rules),
    }
}

/// Rules from the configured file, or the built-in table when no file is set
/// or the file cannot be read.
fn load_rules(config: &AppConfig) -> RuleSet {
    match &config.optimizer.rules_path {
        Some(path) => match load_rule_file(path) {
            Ok(rules) => rules,
            Err(e) => {
                error!(path = %path, error = %e, "Failed to load rule file, using default rules");
                default_rules().into()
            }
        },
        None => {
            info!("No rule file configured, using default rules");
            default_rules().into()
        }
    }
}

async fn serve(config: AppConfig, rules: RuleSet) -> anyhow::Result<()> {
    info!(
        node_id = %config.node_id,
        http_port = config.api.http_port,
        rules = rules.len(),
        "Bidwise starting up"
    );

    let catalog = Arc::new(CatalogStore::with_demo_data());
    let api_server = ApiServer::new(config, catalog, rules);

    if let Err(e) = api_server.start_metrics().await {
        error!(error = %e, "Failed to start metrics exporter");
    }

    info!("Bidwise is ready to serve traffic");

    // Blocks until shutdown
    api_server.start_http().await?;

    Ok(())
}

fn evaluate(records_path: &Path, rules: &RuleSet) -> anyhow::Result<()> {
    let raw = std::fs::read_to_string(records_path)
        .with_context(|| format!("reading records from {}", records_path.display()))?;
    let records: Vec<PerformanceRecord> = serde_json::from_str(&raw)
        .with_context(|| format!("parsing records from {}", records_path.display()))?;

    let report = RecommendationEngine::new().evaluate_set(&records, rules);
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
