//! Error types surfaced by the HTTP layer.

use crate::types::customer::ValidationErrors;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Errors a prediction request can end in.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// One or more fields failed their declared constraint.
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    /// Body could not be read as a customer record.
    #[error("Malformed request body: {message}")]
    MalformedBody { status: StatusCode, message: String },

    /// The classifier failed; fatal to the request.
    #[error("Prediction failed: {0}")]
    Prediction(#[from] anyhow::Error),
}

impl ServiceError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServiceError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ServiceError::MalformedBody { status, .. } => *status,
            ServiceError::Prediction(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ValidationErrors> for ServiceError {
    fn from(errors: ValidationErrors) -> Self {
        ServiceError::Validation(errors)
    }
}

impl From<JsonRejection> for ServiceError {
    fn from(rejection: JsonRejection) -> Self {
        // Missing fields and wrong JSON types arrive as 422, bad syntax as 400
        ServiceError::MalformedBody {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            ServiceError::Validation(errors) => json!({ "detail": errors }),
            ServiceError::MalformedBody { message, .. } => json!({ "detail": message }),
            ServiceError::Prediction(_) => json!({ "detail": "Prediction failed" }),
        };
        (status, Json(body)).into_response()
    }
}
