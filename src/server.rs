//! HTTP surface: health, stats and prediction endpoints

use crate::config::AppConfig;
use crate::error::ServiceError;
use crate::feature_encoder::FeatureEncoder;
use crate::metrics::ServiceMetrics;
use crate::models::inference::Classifier;
use crate::types::customer::CustomerRecord;
use crate::types::prediction::{HealthResponse, PredictionResponse, StatsResponse};
use anyhow::{Context, Result};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Shared state handed to every request handler
#[derive(Clone)]
pub struct AppState {
    pub classifier: Arc<dyn Classifier>,
    pub encoder: Arc<FeatureEncoder>,
    pub metrics: Arc<ServiceMetrics>,
}

impl AppState {
    pub fn new(classifier: Arc<dyn Classifier>, metrics: Arc<ServiceMetrics>) -> Self {
        Self {
            classifier,
            encoder: Arc::new(FeatureEncoder::new()),
            metrics,
        }
    }
}

/// Build the service router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/stats", get(stats))
        .route("/predict_model", post(predict_model))
        .with_state(state)
}

/// Bind the configured address and serve until Ctrl-C
pub async fn serve(config: &AppConfig, state: AppState) -> Result<()> {
    let address = config.bind_address();
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;

    info!(address = %address, "Prediction service listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => {
            error!(error = %e, "Failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
    }
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}

async fn stats(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse {
        request_count: state.metrics.request_count(),
    })
}

async fn predict_model(
    State(state): State<AppState>,
    payload: Result<Json<CustomerRecord>, JsonRejection>,
) -> Result<Json<PredictionResponse>, ServiceError> {
    let request_id = Uuid::new_v4();

    let Json(record) = payload.map_err(|rejection| {
        state.metrics.record_validation_failure();
        warn!(
            request_id = %request_id,
            error = %rejection.body_text(),
            "Rejected malformed request body"
        );
        ServiceError::from(rejection)
    })?;

    if let Err(errors) = record.validate() {
        state.metrics.record_validation_failure();
        warn!(
            request_id = %request_id,
            customer_id = %record.customer_id,
            fields = ?errors.fields(),
            "Rejected invalid customer record"
        );
        return Err(errors.into());
    }

    let start_time = Instant::now();
    let customer_id = record.customer_id.clone();
    let encoder = state.encoder.clone();
    let classifier = state.classifier.clone();

    // Inference is synchronous and CPU-bound
    let outcome = tokio::task::spawn_blocking(move || {
        let features = encoder.encode(&record);
        classifier.predict(&features)
    })
    .await
    .context("Prediction task panicked")
    .and_then(|result| result);

    let label = match outcome {
        Ok(label) => label,
        Err(e) => {
            state.metrics.record_prediction_failure();
            error!(
                request_id = %request_id,
                customer_id = %customer_id,
                error = %e,
                "Prediction failed"
            );
            return Err(ServiceError::Prediction(e));
        }
    };

    let latency = start_time.elapsed();
    let count = state.metrics.record_prediction(label, latency);

    debug!(
        request_id = %request_id,
        customer_id = %customer_id,
        prediction = %label,
        latency_us = latency.as_micros(),
        request_count = count,
        "Prediction served"
    );

    Ok(Json(PredictionResponse { prediction: label }))
}
