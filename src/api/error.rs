//! API error types with structured JSON responses.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::pipeline::quote::{QuoteError, QuoteErrorKind};

/// Error body returned to callers: `{ error, details?, timestamp }`.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    pub timestamp: String,
}

/// API-level errors with HTTP status mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("Request body too large")]
    PayloadTooLarge,
    /// The mapping collaborator failed (unreachable, error status, empty reply).
    #[error("{message}")]
    Upstream { message: String, details: Option<String> },
    /// The analysis itself failed (undecodable workbook, unusable model reply).
    #[error("{message}")]
    Analysis { message: String, details: Option<String> },
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Upstream { .. } => StatusCode::BAD_GATEWAY,
            ApiError::Analysis { .. } | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (error, details) = match self {
            ApiError::BadRequest(detail) => (detail, None),
            ApiError::PayloadTooLarge => ("Request body too large".to_string(), None),
            ApiError::Upstream { message, details } => {
                tracing::warn!(%message, "Mapping collaborator failed");
                (message, details)
            }
            ApiError::Analysis { message, details } => {
                tracing::warn!(%message, "Analysis failed");
                (message, details)
            }
            ApiError::Internal(detail) => {
                tracing::error!(detail, "API internal error");
                ("An internal error occurred".to_string(), None)
            }
        };

        let body = ErrorBody {
            error,
            details,
            timestamp: chrono::Utc::now().to_rfc3339(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<QuoteError> for ApiError {
    fn from(err: QuoteError) -> Self {
        let details = err.details();
        let message = err.to_string();
        match err.kind() {
            QuoteErrorKind::MissingInput => ApiError::BadRequest(message),
            QuoteErrorKind::CollaboratorFailure => ApiError::Upstream { message, details },
            QuoteErrorKind::DecodeFailure
            | QuoteErrorKind::NoJsonFound
            | QuoteErrorKind::MalformedAiResponse => ApiError::Analysis { message, details },
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge
        } else {
            ApiError::BadRequest(rejection.body_text())
        }
    }
}
