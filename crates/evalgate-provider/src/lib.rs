//! Provider layer for Evalgate — the single point of contact with the
//! external model service.
//!
//! # Architecture
//!
//! - [`client::ProviderClient`] — deadline-bounded chat-completions client
//!   with empty-content retry, safe fallback payload, and JSON recovery
//! - [`classify`] — maps transport failures and HTTP statuses onto the
//!   closed [`evalgate_core::ReasonCode`] taxonomy
//! - [`wire`] — the OpenAI-compatible request/response DTOs

pub mod classify;
pub mod client;
pub mod wire;

// Re-export main types for convenience
pub use classify::{classify_status, classify_transport};
pub use client::ProviderClient;
