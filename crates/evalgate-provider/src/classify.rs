//! Failure classification — maps transport errors and HTTP statuses onto the
//! closed [`ReasonCode`] taxonomy.
//!
//! Total: every input maps to exactly one code. A [`ProviderError`] that
//! already exists keeps its own reason by construction (the typed `Result`
//! chain never re-wraps one), so classification here only concerns raw
//! transport and protocol failures. Pure — no logging, and reqwest error
//! messages never carry credentials.
//!
//! [`ProviderError`]: evalgate_core::ProviderError

use evalgate_core::ReasonCode;
use reqwest::StatusCode;

/// Classify a reqwest transport failure.
pub fn classify_transport(err: &reqwest::Error) -> ReasonCode {
    if err.is_timeout() {
        ReasonCode::Timeout
    } else if err.is_connect() || err.is_request() {
        ReasonCode::ProviderConnectionError
    } else if err.is_decode() {
        ReasonCode::ProviderError
    } else {
        ReasonCode::UnknownError
    }
}

/// Classify a non-success HTTP status from the provider.
pub fn classify_status(status: StatusCode) -> ReasonCode {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ReasonCode::AuthInvalid,
        StatusCode::TOO_MANY_REQUESTS => ReasonCode::RateLimited,
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => ReasonCode::Timeout,
        _ => ReasonCode::ProviderError,
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
