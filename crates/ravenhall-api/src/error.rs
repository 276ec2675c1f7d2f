//! API error types.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use ravenhall_core::error::EngineError;
use serde::Serialize;

/// JSON body returned for error responses.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Machine-readable error code.
    pub error: &'static str,
    /// Human-readable error message.
    pub message: String,
}

/// HTTP-layer wrapper around `EngineError` that implements `IntoResponse`.
#[derive(Debug)]
pub struct ApiError(pub EngineError);

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code) = match &self.0 {
            EngineError::SessionNotFound(_) => (StatusCode::NOT_FOUND, "session_not_found"),
            EngineError::ConcurrencyConflict { .. } => {
                (StatusCode::CONFLICT, "concurrency_conflict")
            }
            EngineError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            EngineError::PolicyRejection(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "policy_rejection")
            }
            EngineError::Persistence(_) => (StatusCode::INTERNAL_SERVER_ERROR, "persistence_error"),
        };

        let body = ErrorBody {
            error: error_code,
            message: self.0.to_string(),
        };

        (status, Json(body)).into_response()
    }
}
