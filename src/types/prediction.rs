//! Prediction label and HTTP response bodies

use serde::{Deserialize, Serialize};
use std::fmt;

/// Binary churn label produced by the classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChurnLabel {
    #[serde(rename = "No Churn")]
    NoChurn,
    #[serde(rename = "Churn")]
    Churn,
}

impl ChurnLabel {
    /// Map the classifier's class id. Class 1 is churn, anything else is not.
    pub fn from_class(class: i64) -> Self {
        if class == 1 {
            ChurnLabel::Churn
        } else {
            ChurnLabel::NoChurn
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ChurnLabel::NoChurn => "No Churn",
            ChurnLabel::Churn => "Churn",
        }
    }
}

impl fmt::Display for ChurnLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body of a successful `POST /predict_model`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub prediction: ChurnLabel,
}

/// Body of `GET /stats`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsResponse {
    pub request_count: u64,
}

/// Body of `GET /health`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

impl HealthResponse {
    pub fn ok() -> Self {
        Self {
            status: "OK".to_string(),
        }
    }
}
