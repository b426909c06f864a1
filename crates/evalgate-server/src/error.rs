//! API error surface.
//!
//! Every failure leaving a handler is one of these variants, and every
//! variant renders the same envelope: `{"success": false, "error": {...}}`
//! with a reason code from the closed taxonomy. Raw provider exceptions,
//! stack traces, and credentials never appear in a response body.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use evalgate_core::{ProviderError, ReasonCode};

/// Structured error body inside the envelope.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Coarse category, present for terminal outcomes the backend branches
    /// on (`ai_disabled`, `provider_error`).
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<&'static str>,
    pub reason: ReasonCode,
    pub message: String,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub details: Map<String, Value>,
}

#[derive(Debug, Serialize)]
struct ErrorEnvelope {
    success: bool,
    error: ErrorBody,
}

/// Failures a handler can return.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Request body was not parseable at all.
    #[error("invalid JSON body: {0}")]
    JsonInvalid(String),

    /// Body parsed but a required field is missing or malformed.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Admin token missing, mismatched, or not configured.
    #[error("forbidden")]
    Forbidden,

    /// Provider disabled, unconfigured, or not yet validated — the caller
    /// must route the submission to manual review.
    #[error("AI evaluation is disabled")]
    AiDisabled,

    /// A provider interaction failed with a classified reason.
    #[error("provider failure: {0}")]
    Provider(#[from] ProviderError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::JsonInvalid(message) => {
                tracing::warn!(message = %message, "rejecting unparsable request body");
                (
                    StatusCode::BAD_REQUEST,
                    ErrorBody {
                        kind: None,
                        reason: ReasonCode::JsonInvalid,
                        message,
                        details: Map::new(),
                    },
                )
            }
            ApiError::Validation(message) => {
                tracing::warn!(message = %message, "rejecting invalid request");
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    ErrorBody {
                        kind: None,
                        reason: ReasonCode::ValidationError,
                        message,
                        details: Map::new(),
                    },
                )
            }
            ApiError::Forbidden => (
                StatusCode::FORBIDDEN,
                ErrorBody {
                    kind: None,
                    reason: ReasonCode::Forbidden,
                    message: "Forbidden".to_string(),
                    details: Map::new(),
                },
            ),
            ApiError::AiDisabled => (
                StatusCode::SERVICE_UNAVAILABLE,
                ErrorBody {
                    kind: Some("ai_disabled"),
                    reason: ReasonCode::AiDisabled,
                    message: "AI evaluation is disabled. Manual review required.".to_string(),
                    details: Map::new(),
                },
            ),
            ApiError::Provider(err) => {
                tracing::error!(reason = %err.reason, message = %err.message, "provider failure");
                (
                    StatusCode::BAD_GATEWAY,
                    ErrorBody {
                        kind: Some("provider_error"),
                        reason: err.reason,
                        message: err.message,
                        details: err.details,
                    },
                )
            }
        };

        let envelope = ErrorEnvelope {
            success: false,
            error: body,
        };
        (status, Json(envelope)).into_response()
    }
}

/// Result type alias for API handlers.
pub type ApiResult<T> = Result<T, ApiError>;

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
