//! Failure taxonomy for provider interactions.
//!
//! Every failure anywhere in the evaluation path terminates in exactly one
//! [`ReasonCode`]. The set is closed: callers match exhaustively and there is
//! no "other" escape hatch beyond [`ReasonCode::UnknownError`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

// ─────────────────────────────────────────────
// ReasonCode
// ─────────────────────────────────────────────

/// Why a provider interaction (or request handling step) failed.
///
/// Serialized as snake_case strings on the wire (`"rate_limited"`, …).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonCode {
    /// No API key configured while the provider is enabled.
    MissingKey,
    /// The HTTP client stack itself could not be constructed.
    SdkMissing,
    /// The provider rejected our credentials.
    AuthInvalid,
    /// The provider rate-limited the request.
    RateLimited,
    /// The local deadline expired (or the provider reported a timeout).
    Timeout,
    /// Transport-level failure reaching the provider.
    ProviderConnectionError,
    /// Any other provider-reported API error.
    ProviderError,
    /// Provider content could not be parsed as JSON, even heuristically.
    ParseError,
    /// Anything that matched no other code.
    UnknownError,
    /// Evaluation is disabled; the submission needs manual review.
    AiDisabled,
    /// The inbound request body was not valid JSON.
    JsonInvalid,
    /// The inbound request failed shape validation.
    ValidationError,
    /// Admin action rejected (missing/mismatched/unconfigured token).
    Forbidden,
}

impl ReasonCode {
    /// Wire-format string for this code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReasonCode::MissingKey => "missing_key",
            ReasonCode::SdkMissing => "sdk_missing",
            ReasonCode::AuthInvalid => "auth_invalid",
            ReasonCode::RateLimited => "rate_limited",
            ReasonCode::Timeout => "timeout",
            ReasonCode::ProviderConnectionError => "provider_connection_error",
            ReasonCode::ProviderError => "provider_error",
            ReasonCode::ParseError => "parse_error",
            ReasonCode::UnknownError => "unknown_error",
            ReasonCode::AiDisabled => "ai_disabled",
            ReasonCode::JsonInvalid => "json_invalid",
            ReasonCode::ValidationError => "validation_error",
            ReasonCode::Forbidden => "forbidden",
        }
    }
}

impl std::fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─────────────────────────────────────────────
// ProviderError
// ─────────────────────────────────────────────

/// A classified provider failure.
///
/// Immutable once constructed. `details` carries bounded diagnostics (status
/// code, content type, truncated raw preview) that are safe to return to the
/// caller; credentials and full payloads never go in here.
#[derive(Debug, Error)]
#[error("{reason}: {message}")]
pub struct ProviderError {
    /// The classified reason.
    pub reason: ReasonCode,
    /// Human-readable description (no secrets).
    pub message: String,
    /// Structured diagnostics for the client-facing error envelope.
    pub details: Map<String, Value>,
    /// The underlying error, when one exists.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ProviderError {
    /// Create an error with a reason and message, no details.
    pub fn new(reason: ReasonCode, message: impl Into<String>) -> Self {
        ProviderError {
            reason,
            message: message.into(),
            details: Map::new(),
            source: None,
        }
    }

    /// Attach structured diagnostic details.
    pub fn with_details(mut self, details: Map<String, Value>) -> Self {
        self.details = details;
        self
    }

    /// Attach the underlying error.
    pub fn with_source(
        mut self,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        self.source = Some(Box::new(source));
        self
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_reason_code_serializes_snake_case() {
        assert_eq!(
            serde_json::to_value(ReasonCode::ProviderConnectionError).unwrap(),
            json!("provider_connection_error")
        );
        assert_eq!(
            serde_json::to_value(ReasonCode::AiDisabled).unwrap(),
            json!("ai_disabled")
        );
    }

    #[test]
    fn test_reason_code_round_trip() {
        for code in [
            ReasonCode::MissingKey,
            ReasonCode::SdkMissing,
            ReasonCode::AuthInvalid,
            ReasonCode::RateLimited,
            ReasonCode::Timeout,
            ReasonCode::ProviderConnectionError,
            ReasonCode::ProviderError,
            ReasonCode::ParseError,
            ReasonCode::UnknownError,
            ReasonCode::AiDisabled,
            ReasonCode::JsonInvalid,
            ReasonCode::ValidationError,
            ReasonCode::Forbidden,
        ] {
            let s = serde_json::to_string(&code).unwrap();
            let back: ReasonCode = serde_json::from_str(&s).unwrap();
            assert_eq!(back, code);
            assert_eq!(s, format!("\"{}\"", code.as_str()));
        }
    }

    #[test]
    fn test_provider_error_display() {
        let err = ProviderError::new(ReasonCode::RateLimited, "Rate limited by provider");
        assert_eq!(err.to_string(), "rate_limited: Rate limited by provider");
    }

    #[test]
    fn test_provider_error_with_details() {
        let mut details = Map::new();
        details.insert("status_code".to_string(), json!(502));
        let err = ProviderError::new(ReasonCode::ParseError, "not JSON").with_details(details);

        assert_eq!(err.reason, ReasonCode::ParseError);
        assert_eq!(err.details["status_code"], json!(502));
    }

    #[test]
    fn test_provider_error_source_chain() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err =
            ProviderError::new(ReasonCode::ProviderConnectionError, "connect failed").with_source(io);

        assert!(std::error::Error::source(&err).is_some());
    }
}
