//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use fanout::FanOutError;
use saga::SagaError;
use thiserror::Error;

/// API-level error type that maps to HTTP responses.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Saga execution error.
    #[error(transparent)]
    Saga(#[from] SagaError),
    /// Fan-out error.
    #[error(transparent)]
    FanOut(#[from] FanOutError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Saga(err) => saga_status(err),
            ApiError::FanOut(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let mut body = serde_json::json!({ "error": self.to_string() });
        if let ApiError::Saga(err) = &self {
            if let Some(doi) = err.doi() {
                body["doi"] = doi.to_string().into();
            }
            if let Some(operation) = err.operation() {
                body["operation"] = operation.as_str().into();
            }
            if err.requires_manual_remediation() {
                tracing::error!(error = %err, "identifier needs manual remediation");
                body["manual_remediation"] = true.into();
            }
        }
        if status.is_server_error() {
            tracing::error!(error = %self, %status, "request failed");
        }

        (status, axum::Json(body)).into_response()
    }
}

fn saga_status(err: &SagaError) -> StatusCode {
    match err {
        _ if err.is_not_draft() => StatusCode::CONFLICT,
        SagaError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
        SagaError::Remote { .. }
        | SagaError::CompensationFailed { .. }
        | SagaError::Resolver(_)
        | SagaError::Metadata { .. } => StatusCode::BAD_GATEWAY,
    }
}
