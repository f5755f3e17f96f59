use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::fmt;

use crate::services::TrendError;

/// API-surface failure, paired with the request id so every error body can
/// be correlated with its logs.
#[derive(Debug)]
pub struct ApiError {
    kind: ApiErrorKind,
    request_id: String,
}

#[derive(Debug)]
enum ApiErrorKind {
    Validation(String),

    NotFound {
        message: String,
        details: Option<serde_json::Value>,
    },

    RateLimited,

    UpstreamUnavailable {
        message: String,
        attempts: u32,
        blocked: bool,
    },

    InternalError(String),
}

/// Error body shape: `{ "error": ..., "details"?: ..., "request_id": ... }`.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
    request_id: String,
}

impl ApiError {
    #[must_use]
    pub fn validation(message: impl Into<String>, request_id: &str) -> Self {
        Self {
            kind: ApiErrorKind::Validation(message.into()),
            request_id: request_id.to_string(),
        }
    }

    #[must_use]
    pub fn not_found(message: impl Into<String>, request_id: &str) -> Self {
        Self {
            kind: ApiErrorKind::NotFound {
                message: message.into(),
                details: None,
            },
            request_id: request_id.to_string(),
        }
    }

    #[must_use]
    pub fn rate_limited(request_id: &str) -> Self {
        Self {
            kind: ApiErrorKind::RateLimited,
            request_id: request_id.to_string(),
        }
    }

    #[must_use]
    pub fn internal(message: impl Into<String>, request_id: &str) -> Self {
        Self {
            kind: ApiErrorKind::InternalError(message.into()),
            request_id: request_id.to_string(),
        }
    }

    /// Maps an engine failure onto the API surface.
    #[must_use]
    pub fn from_engine(err: TrendError, request_id: &str) -> Self {
        let message = err.to_string();
        let kind = match err {
            TrendError::DataNotFound { keyword, country } => ApiErrorKind::NotFound {
                message,
                details: Some(serde_json::json!({
                    "keyword": keyword,
                    "country": country,
                })),
            },
            TrendError::ProviderUnavailable {
                attempts, blocked, ..
            } => ApiErrorKind::UpstreamUnavailable {
                message,
                attempts,
                blocked,
            },
            TrendError::Storage(msg) => ApiErrorKind::InternalError(msg),
        };

        Self {
            kind,
            request_id: request_id.to_string(),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ApiErrorKind::Validation(msg) => write!(f, "Validation error: {msg}"),
            ApiErrorKind::NotFound { message, .. } => write!(f, "Not found: {message}"),
            ApiErrorKind::RateLimited => write!(f, "Rate limit exceeded"),
            ApiErrorKind::UpstreamUnavailable { message, .. } => {
                write!(f, "Upstream unavailable: {message}")
            }
            ApiErrorKind::InternalError(msg) => write!(f, "Internal error: {msg}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let request_id = self.request_id;

        let (status, error, details) = match self.kind {
            ApiErrorKind::Validation(msg) => (StatusCode::BAD_REQUEST, msg, None),
            ApiErrorKind::NotFound { message, details } => {
                (StatusCode::NOT_FOUND, message, details)
            }
            ApiErrorKind::RateLimited => (
                StatusCode::TOO_MANY_REQUESTS,
                "Rate limit exceeded. Please try again later.".to_string(),
                None,
            ),
            ApiErrorKind::UpstreamUnavailable {
                message,
                attempts,
                blocked,
            } => {
                if blocked {
                    tracing::warn!(
                        request_id = %request_id,
                        attempts,
                        "Upstream blocked the request (anti-bot page)"
                    );
                } else {
                    tracing::error!(
                        request_id = %request_id,
                        attempts,
                        "Upstream unavailable: {message}"
                    );
                }
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    message,
                    Some(serde_json::json!({ "attempts": attempts })),
                )
            }
            ApiErrorKind::InternalError(msg) => {
                tracing::error!(request_id = %request_id, "Internal error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal error occurred".to_string(),
                    None,
                )
            }
        };

        let body = ErrorBody {
            error,
            details,
            request_id,
        };

        (status, Json(body)).into_response()
    }
}
