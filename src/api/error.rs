//! API error types with structured JSON responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::pipeline::processor::ProcessingError;

/// Body of every non-2xx response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub status: &'static str,
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<String>,
}

/// API-level errors with HTTP status mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Processing(#[from] ProcessingError),
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("Upload exceeds the size limit")]
    PayloadTooLarge,
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Processing(err) => match err {
                ProcessingError::MissingInput
                | ProcessingError::EmptyInput
                | ProcessingError::LowConfidence { .. } => StatusCode::BAD_REQUEST,
                ProcessingError::CollaboratorTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
                ProcessingError::Collaborator { .. }
                | ProcessingError::SchemaViolation(_)
                | ProcessingError::ClientInit(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::Processing(err) => err.code(),
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::PayloadTooLarge => "PAYLOAD_TOO_LARGE",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();

        let (message, debug) = match &self {
            ApiError::Internal(detail) => {
                tracing::error!(detail, "API internal error");
                ("An internal error occurred".to_string(), None)
            }
            ApiError::Processing(err) => {
                if status.is_server_error() {
                    tracing::error!(code, error = %err, "Report processing failed");
                } else {
                    tracing::info!(code, "Report rejected");
                }
                (err.to_string(), err.debug().map(str::to_string))
            }
            other => (other.to_string(), None),
        };

        let body = ErrorBody {
            status: "error",
            code,
            message,
            debug,
        };

        (status, Json(body)).into_response()
    }
}
