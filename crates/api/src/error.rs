//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use orchestrator::ProvisioningError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Request conflicts with the current state of the resource.
    Conflict(String),
    /// Provisioning error.
    Provisioning(ProvisioningError),
    /// Internal server error.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::Provisioning(err) => provisioning_error_to_response(err),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn provisioning_error_to_response(err: ProvisioningError) -> (StatusCode, String) {
    match &err {
        ProvisioningError::Validation(_) => (StatusCode::BAD_REQUEST, err.to_string()),
        ProvisioningError::Directory(tenancy::DirectoryError::SlugTaken(_))
        | ProvisioningError::Directory(tenancy::DirectoryError::InvalidSlug(_)) => {
            (StatusCode::BAD_REQUEST, err.to_string())
        }
        _ => {
            tracing::error!(error = %err, "provisioning error");
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}

impl From<ProvisioningError> for ApiError {
    fn from(err: ProvisioningError) -> Self {
        ApiError::Provisioning(err)
    }
}
