//! Churn Prediction Service - Main Entry Point
//!
//! Loads the classifier once, then serves `/health`, `/stats` and
//! `/predict_model` until interrupted.

use anyhow::Result;
use churn_prediction_service::{
    config::AppConfig,
    metrics::{MetricsReporter, ServiceMetrics},
    models::inference::InferenceEngine,
    server::{self, AppState},
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args().nth(1);
    let config = match &config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };

    // RUST_LOG takes precedence over the configured level
    let filter = EnvFilter::try_from_default_env().or_else(|_| {
        EnvFilter::try_new(format!(
            "churn_prediction_service={}",
            config.logging.level
        ))
    })?;
    if config.logging.format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    info!("Starting Churn Prediction Service");
    info!(
        config = config_path.as_deref().unwrap_or("config/config.toml"),
        "Configuration loaded successfully"
    );

    let metrics = Arc::new(ServiceMetrics::new());

    let classifier = Arc::new(InferenceEngine::new(&config)?);
    info!(
        model = %config.model.path,
        decision_threshold = classifier.decision_threshold(),
        "Classifier loaded"
    );

    let reporter = MetricsReporter::new(metrics.clone(), config.metrics.report_interval_secs);
    tokio::spawn(reporter.start());

    let state = AppState::new(classifier, metrics.clone());
    info!(
        "Feature encoder initialized ({} features)",
        state.encoder.feature_count()
    );

    server::serve(&config, state).await?;

    info!("Prediction service shutting down...");
    metrics.print_summary();

    Ok(())
}
