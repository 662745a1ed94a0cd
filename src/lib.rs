//! Churn Prediction Service Library
//!
//! Serves churn predictions from a pre-trained gradient-boosted classifier
//! over HTTP. Raw customer records are validated, encoded into the fixed
//! feature schema the model was trained on, and classified.

pub mod config;
pub mod error;
pub mod feature_encoder;
pub mod metrics;
pub mod models;
pub mod server;
pub mod types;

pub use config::AppConfig;
pub use error::ServiceError;
pub use feature_encoder::{FeatureEncoder, FeatureSlot, FeatureVector};
pub use models::inference::{Classifier, InferenceEngine};
pub use server::AppState;
pub use types::{customer::CustomerRecord, prediction::ChurnLabel};
