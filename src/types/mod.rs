//! Type definitions for the churn prediction service

pub mod customer;
pub mod prediction;

pub use customer::{CustomerRecord, FieldViolation, ValidationErrors};
pub use prediction::{ChurnLabel, HealthResponse, PredictionResponse, StatsResponse};
