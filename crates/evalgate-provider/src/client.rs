//! Deadline-bounded provider client.
//!
//! One instance per process, holding the credential in memory only. Every
//! call is wrapped in `tokio::time::timeout`, which drops the request future
//! when the deadline fires — the underlying connection is aborted, not
//! abandoned.
//!
//! Recovery behavior, in order:
//! - empty content → one silent identical retry, then the safe fallback
//!   payload (callers always get *some* structured result for this case)
//! - non-empty non-JSON content → the extraction chain; if the whole chain
//!   fails, a `parse_error` carrying bounded diagnostics (status, content
//!   type, truncated preview — never the full payload, never the key)

use std::time::Duration;

use reqwest::StatusCode;
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use evalgate_core::config::ProviderSettings;
use evalgate_core::extract::{extract_json, JsonObject};
use evalgate_core::{ProviderError, ReasonCode};

use crate::classify::{classify_status, classify_transport};
use crate::wire::{ChatCompletionRequest, ChatCompletionResponse, Message};

/// Default API base when neither config nor env supplies one.
const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

/// Maximum characters of raw provider output carried in error details.
const RAW_PREVIEW_CHARS: usize = 500;

/// Minimal ping asking for a trivial JSON echo.
const PING_PROMPT: &str = r#"Return JSON: {"ping": "pong"}"#;

// ─────────────────────────────────────────────
// ProviderClient
// ─────────────────────────────────────────────

/// Single point of contact with the external model provider.
pub struct ProviderClient {
    /// HTTP client (shared, connection-pooled). No client-level timeout;
    /// the per-call deadline governs.
    client: reqwest::Client,
    /// API base URL (e.g. `"https://api.openai.com/v1"`).
    api_base: String,
    /// API key for Bearer authentication. Never logged.
    api_key: String,
    /// Model identifier sent with each call.
    model: String,
    /// Generation cap per call.
    max_output_tokens: u32,
    /// Sampling temperature.
    temperature: f64,
}

impl std::fmt::Debug for ProviderClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderClient")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .finish()
    }
}

/// One completed HTTP exchange: extracted text plus diagnostics for
/// parse-failure reporting.
struct Fetched {
    content: Option<String>,
    status: StatusCode,
    content_type: Option<String>,
}

impl ProviderClient {
    /// Create a client from provider settings.
    ///
    /// Fails with `missing_key` when no credential is configured and with
    /// `sdk_missing` when the HTTP stack itself cannot be constructed.
    pub fn new(settings: &ProviderSettings) -> Result<Self, ProviderError> {
        if settings.api_key.is_empty() {
            return Err(ProviderError::new(
                ReasonCode::MissingKey,
                "Missing provider API key",
            ));
        }

        let client = reqwest::Client::builder().build().map_err(|e| {
            ProviderError::new(
                ReasonCode::SdkMissing,
                "HTTP client could not be constructed",
            )
            .with_source(e)
        })?;

        Ok(ProviderClient {
            client,
            api_base: settings
                .api_base
                .clone()
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            api_key: settings.api_key.clone(),
            model: settings.model.clone(),
            max_output_tokens: settings.max_output_tokens,
            temperature: settings.temperature,
        })
    }

    /// Build the full chat completions URL.
    fn completions_url(&self) -> String {
        let base = self.api_base.trim_end_matches('/');
        format!("{}/chat/completions", base)
    }

    /// Issue one evaluation call and return the parsed JSON payload.
    pub async fn call(
        &self,
        prompt: &str,
        deadline: Duration,
    ) -> Result<JsonObject, ProviderError> {
        let Fetched {
            content,
            mut status,
            mut content_type,
        } = self.fetch(prompt, deadline).await?;

        let mut content = content.unwrap_or_default();
        if content.trim().is_empty() {
            warn!("provider returned no content on first attempt; retrying once");
            let retried = self.fetch(prompt, deadline).await?;
            status = retried.status;
            content_type = retried.content_type;
            content = retried.content.unwrap_or_default();

            if content.trim().is_empty() {
                warn!("provider returned no content after retry; substituting fallback payload");
                return Ok(fallback_payload());
            }
        }

        if let Ok(Value::Object(obj)) = serde_json::from_str::<Value>(content.trim()) {
            return Ok(obj);
        }
        if let Some(obj) = extract_json(&content) {
            warn!("recovered JSON from provider output heuristically");
            return Ok(obj);
        }

        let mut details = Map::new();
        details.insert("raw_preview".to_string(), json!(preview(&content)));
        details.insert("status_code".to_string(), json!(status.as_u16()));
        details.insert(
            "content_type".to_string(),
            content_type.map(Value::String).unwrap_or(Value::Null),
        );
        warn!(status = %status, "failed to parse provider JSON response");
        Err(
            ProviderError::new(ReasonCode::ParseError, "Failed to parse provider JSON response")
                .with_details(details),
        )
    }

    /// Reachability check: a tiny ping prompt requesting a JSON echo.
    ///
    /// A `parse_error` on the ping means the provider answered with prose —
    /// it is reachable, which is all this check asserts. Evaluation calls
    /// will still surface their own parse failures.
    pub async fn validate(&self, deadline: Duration) -> Result<(), ProviderError> {
        match self.call(PING_PROMPT, deadline).await {
            Ok(_) => Ok(()),
            Err(e) if e.reason == ReasonCode::ParseError => {
                warn!("validation ping returned non-JSON; treating provider as reachable");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// One HTTP exchange, bounded by `deadline`.
    async fn fetch(&self, prompt: &str, deadline: Duration) -> Result<Fetched, ProviderError> {
        let request_body = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![Message::user(prompt)],
            max_tokens: Some(self.max_output_tokens),
            temperature: Some(self.temperature),
        };
        let url = self.completions_url();

        debug!(model = %self.model, "calling provider");

        let exchange = async {
            let response = self
                .client
                .post(&url)
                .bearer_auth(&self.api_key)
                .json(&request_body)
                .send()
                .await
                .map_err(|e| {
                    let reason = classify_transport(&e);
                    ProviderError::new(reason, format!("Provider request failed: {e}"))
                        .with_source(e)
                })?;

            let status = response.status();
            let content_type = response
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(String::from);

            if !status.is_success() {
                let reason = classify_status(status);
                let body = response.text().await.unwrap_or_default();
                let mut details = Map::new();
                details.insert("status_code".to_string(), json!(status.as_u16()));
                details.insert("body_preview".to_string(), json!(preview(&body)));
                warn!(status = %status, reason = %reason, "provider API error");
                return Err(ProviderError::new(
                    reason,
                    format!("Provider API error (status {status})"),
                )
                .with_details(details));
            }

            let parsed = response
                .json::<ChatCompletionResponse>()
                .await
                .map_err(|e| {
                    ProviderError::new(
                        ReasonCode::ProviderError,
                        "Failed to decode provider response",
                    )
                    .with_source(e)
                })?;

            Ok(Fetched {
                content: parsed.into_content(),
                status,
                content_type,
            })
        };

        match tokio::time::timeout(deadline, exchange).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::new(
                ReasonCode::Timeout,
                "Provider request timed out",
            )),
        }
    }
}

/// Safe payload substituted when the provider yields no content at all.
fn fallback_payload() -> JsonObject {
    let mut obj = Map::new();
    obj.insert("total_score".to_string(), json!(0));
    obj.insert("passed".to_string(), json!(false));
    obj.insert(
        "summary".to_string(),
        json!("AI evaluation failed: provider returned no content."),
    );
    obj.insert("provider_malformed".to_string(), json!(true));
    obj
}

/// Bounded, char-safe preview of raw output for diagnostics.
fn preview(raw: &str) -> String {
    raw.chars().take(RAW_PREVIEW_CHARS).collect()
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
