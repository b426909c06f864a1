//! Configuration schema.
//!
//! Hierarchy: `Config` → `ServerConfig`, `ProviderSettings`, `AdminConfig`,
//! `LimitsConfig`, `NormalizationConfig`.
//!
//! JSON on disk uses **camelCase** keys; Rust uses snake_case.
//! We use `#[serde(rename_all = "camelCase")]` to handle the conversion.

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────
// Root Config
// ─────────────────────────────────────────────

/// Root configuration — loaded from `evalgate.json` + env vars.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub server: ServerConfig,
    pub provider: ProviderSettings,
    pub admin: AdminConfig,
    pub limits: LimitsConfig,
    pub normalization: NormalizationConfig,
}

// ─────────────────────────────────────────────
// Server
// ─────────────────────────────────────────────

/// HTTP listener settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerConfig {
    /// Listen address.
    pub host: String,
    /// Listen port.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8001,
        }
    }
}

// ─────────────────────────────────────────────
// Provider
// ─────────────────────────────────────────────

/// Settings for the external model provider.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProviderSettings {
    /// Whether AI evaluation is enabled at all. When false, every evaluation
    /// short-circuits to the manual-review outcome.
    pub enabled: bool,
    /// Provider name reported in health responses.
    pub name: String,
    /// API key for Bearer authentication. Held in memory only, never logged.
    #[serde(default)]
    pub api_key: String,
    /// Custom API base URL (overrides the provider default).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
    /// Model identifier sent with each call.
    pub model: String,
    /// Deadline for evaluation calls, in seconds.
    pub timeout_seconds: u64,
    /// Deadline for the validation ping, in seconds. Capped at
    /// `timeout_seconds` when larger.
    pub validate_timeout_seconds: u64,
    /// Maximum tokens the provider may generate per call.
    pub max_output_tokens: u32,
    /// Sampling temperature. Kept at 0 so scoring stays repeatable.
    pub temperature: f64,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            name: "openai".to_string(),
            api_key: String::new(),
            api_base: None,
            model: "gpt-4o-mini".to_string(),
            timeout_seconds: 25,
            validate_timeout_seconds: 10,
            max_output_tokens: 1000,
            temperature: 0.0,
        }
    }
}

impl ProviderSettings {
    /// Whether a credential is present.
    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }

    /// Effective validation deadline (never longer than the call deadline).
    pub fn validate_timeout(&self) -> u64 {
        self.validate_timeout_seconds.min(self.timeout_seconds)
    }
}

// ─────────────────────────────────────────────
// Admin
// ─────────────────────────────────────────────

/// Admin surface settings.
///
/// An empty token means the revalidation endpoint is permanently forbidden —
/// it fails closed, not open.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AdminConfig {
    /// Shared secret expected in the `X-Admin-Token` header.
    #[serde(default)]
    pub token: String,
}

impl AdminConfig {
    /// Whether an admin token is configured.
    pub fn is_configured(&self) -> bool {
        !self.token.is_empty()
    }
}

// ─────────────────────────────────────────────
// Limits
// ─────────────────────────────────────────────

/// Input size limits.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LimitsConfig {
    /// Character cap applied to each free-text submission field.
    pub max_field_chars: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_field_chars: 2000,
        }
    }
}

// ─────────────────────────────────────────────
// Normalization
// ─────────────────────────────────────────────

/// Recognition rules for legacy manual-review signaling embedded in provider
/// payloads.
///
/// Older prompt revisions taught the model several different ways to say
/// "this needs a human" — a boolean flag, a reason string, an outcome string,
/// sometimes nested under a metadata object. Which spellings to honor is an
/// artifact of prompt history, not a stable contract, so the key set lives in
/// configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NormalizationConfig {
    /// Keys whose boolean `true` value signals manual review.
    pub manual_review_flags: Vec<String>,
    /// Keys whose string value is checked against `manual_review_values`.
    pub manual_review_keys: Vec<String>,
    /// Marker strings that signal manual review.
    pub manual_review_values: Vec<String>,
    /// Sub-object keys also searched for the markers above.
    pub metadata_keys: Vec<String>,
}

impl Default for NormalizationConfig {
    fn default() -> Self {
        Self {
            manual_review_flags: vec!["ai_disabled".to_string()],
            manual_review_keys: vec![
                "reason".to_string(),
                "outcome".to_string(),
                "evaluation_outcome".to_string(),
            ],
            manual_review_values: vec!["ai_disabled".to_string(), "manual_review".to_string()],
            metadata_keys: vec!["meta".to_string(), "metadata".to_string()],
        }
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.port, 8001);
        assert!(config.provider.enabled);
        assert_eq!(config.provider.timeout_seconds, 25);
        assert_eq!(config.limits.max_field_chars, 2000);
        assert!(!config.admin.is_configured());
    }

    #[test]
    fn test_config_from_json_camel_case() {
        let json = serde_json::json!({
            "server": { "host": "0.0.0.0", "port": 9090 },
            "provider": {
                "model": "gpt-4o",
                "timeoutSeconds": 40,
                "maxOutputTokens": 500
            },
            "admin": { "token": "s3cret" }
        });

        let config: Config = serde_json::from_value(json).unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.provider.model, "gpt-4o");
        assert_eq!(config.provider.timeout_seconds, 40);
        assert_eq!(config.provider.max_output_tokens, 500);
        assert!(config.admin.is_configured());
        // Defaults preserved for missing fields
        assert!(config.provider.enabled);
        assert_eq!(config.limits.max_field_chars, 2000);
    }

    #[test]
    fn test_config_json_uses_camel_case() {
        let config = Config::default();
        let json = serde_json::to_value(&config).unwrap();
        assert!(json["provider"].get("timeoutSeconds").is_some());
        assert!(json["provider"].get("timeout_seconds").is_none());
        assert!(json["limits"].get("maxFieldChars").is_some());
    }

    #[test]
    fn test_provider_is_configured() {
        let mut provider = ProviderSettings::default();
        assert!(!provider.is_configured());
        provider.api_key = "sk-123".to_string();
        assert!(provider.is_configured());
    }

    #[test]
    fn test_validate_timeout_capped_by_call_timeout() {
        let provider = ProviderSettings {
            timeout_seconds: 5,
            validate_timeout_seconds: 10,
            ..Default::default()
        };
        assert_eq!(provider.validate_timeout(), 5);

        let provider = ProviderSettings::default();
        assert_eq!(provider.validate_timeout(), 10);
    }

    #[test]
    fn test_normalization_defaults_cover_legacy_markers() {
        let rules = NormalizationConfig::default();
        assert!(rules.manual_review_flags.contains(&"ai_disabled".to_string()));
        assert!(rules.manual_review_values.contains(&"manual_review".to_string()));
        assert!(rules.metadata_keys.contains(&"meta".to_string()));
    }

    #[test]
    fn test_empty_json_gives_defaults() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config.provider.model, "gpt-4o-mini");
        assert_eq!(config.server.port, 8001);
    }
}
