//! Application error type mapping to HTTP status codes and envelope format.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use orcha_infra::host::HostError;

use crate::http::response::ApiResponse;

#[derive(Debug)]
pub enum AppError {
    Host(HostError),
    /// Malformed request outside the host's own validation.
    Validation(String),
    Internal(String),
}

impl From<HostError> for AppError {
    fn from(e: HostError) -> Self {
        AppError::Host(e)
    }
}

impl AppError {
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::Host(e @ HostError::InvalidSpecification(_)) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", e.to_string())
            }
            AppError::Host(e @ HostError::RunNotFound(_)) => {
                (StatusCode::NOT_FOUND, "RUN_NOT_FOUND", e.to_string())
            }
            AppError::Host(e @ HostError::RunNotRunning { .. }) => {
                (StatusCode::CONFLICT, "RUN_NOT_RUNNING", e.to_string())
            }
            AppError::Host(e @ HostError::Start(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "START_FAILED", e.to_string())
            }
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Internal(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg.clone())
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();
        if status.is_server_error() {
            tracing::error!(code, error = message.as_str(), "request failed");
        }
        ApiResponse::error(status, code, &message, uuid::Uuid::now_v7().to_string()).into_response()
    }
}
