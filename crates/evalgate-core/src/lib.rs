//! Core domain layer for Evalgate.
//!
//! Everything here is independent of the HTTP stack on both sides:
//!
//! - [`error`] — the closed failure taxonomy ([`error::ReasonCode`]) and the
//!   structured [`error::ProviderError`] carried through every failure path
//! - [`extract`] — the ordered JSON-extraction strategy chain applied to raw
//!   provider output
//! - [`sanitize`] — free-text cleanup and submission URL validation
//! - [`result`] — normalization of a parsed provider payload into an
//!   [`result::EvaluationResult`]
//! - [`health`] — process-wide provider readiness state
//! - [`config`] — typed configuration with JSON file + env var loading

pub mod config;
pub mod error;
pub mod extract;
pub mod health;
pub mod result;
pub mod sanitize;

pub use config::{load_config, Config};
pub use error::{ProviderError, ReasonCode};
pub use extract::extract_json;
pub use health::{Health, HealthSnapshot};
pub use result::{normalize_payload, EvaluationResult, Normalized};
