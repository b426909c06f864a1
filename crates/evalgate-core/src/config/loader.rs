//! Config loader — reads `evalgate.json` and merges env vars.
//!
//! # Loading precedence
//! 1. Defaults (from `Config::default()`)
//! 2. JSON file at `$EVALGATE_CONFIG` or `./evalgate.json`
//! 3. Environment variables `EVALGATE_<SECTION>__<FIELD>` (override JSON)

use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::schema::Config;

/// Default config file path.
pub fn get_config_path() -> PathBuf {
    std::env::var("EVALGATE_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("evalgate.json"))
}

/// Load configuration from the default path + env vars.
///
/// Falls back to `Config::default()` if the file doesn't exist or can't be parsed.
pub fn load_config(path: Option<&Path>) -> Config {
    let config_path = path.map(PathBuf::from).unwrap_or_else(get_config_path);
    load_config_from_path(&config_path)
}

/// Load config from a specific file path.
fn load_config_from_path(path: &Path) -> Config {
    if !path.exists() {
        info!("No config file found at {}, using defaults", path.display());
        return apply_env_overrides(Config::default());
    }

    debug!("Loading config from {}", path.display());

    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            warn!("Failed to read config file {}: {}", path.display(), e);
            return apply_env_overrides(Config::default());
        }
    };

    let config: Config = match serde_json::from_str(&content) {
        Ok(c) => c,
        Err(e) => {
            warn!("Failed to parse config JSON: {}", e);
            return apply_env_overrides(Config::default());
        }
    };

    apply_env_overrides(config)
}

/// Apply environment variable overrides on top of a loaded config.
///
/// Env var format: `EVALGATE_<SECTION>__<FIELD>` (double underscore as delimiter).
///
/// Supported overrides:
/// - `EVALGATE_SERVER__HOST` → `server.host`
/// - `EVALGATE_SERVER__PORT` → `server.port`
/// - `EVALGATE_PROVIDER__ENABLED` → `provider.enabled`
/// - `EVALGATE_PROVIDER__API_KEY` → `provider.api_key`
/// - `EVALGATE_PROVIDER__API_BASE` → `provider.api_base`
/// - `EVALGATE_PROVIDER__MODEL` → `provider.model`
/// - `EVALGATE_PROVIDER__TIMEOUT_SECONDS` → `provider.timeout_seconds`
/// - `EVALGATE_PROVIDER__VALIDATE_TIMEOUT_SECONDS` → `provider.validate_timeout_seconds`
/// - `EVALGATE_PROVIDER__MAX_OUTPUT_TOKENS` → `provider.max_output_tokens`
/// - `EVALGATE_ADMIN__TOKEN` → `admin.token`
/// - `EVALGATE_LIMITS__MAX_FIELD_CHARS` → `limits.max_field_chars`
fn apply_env_overrides(mut config: Config) -> Config {
    if let Ok(val) = std::env::var("EVALGATE_SERVER__HOST") {
        config.server.host = val;
    }
    if let Ok(val) = std::env::var("EVALGATE_SERVER__PORT") {
        if let Ok(p) = val.parse::<u16>() {
            config.server.port = p;
        }
    }

    if let Ok(val) = std::env::var("EVALGATE_PROVIDER__ENABLED") {
        config.provider.enabled = val == "true" || val == "1";
    }
    if let Ok(val) = std::env::var("EVALGATE_PROVIDER__API_KEY") {
        config.provider.api_key = val;
    }
    if let Ok(val) = std::env::var("EVALGATE_PROVIDER__API_BASE") {
        config.provider.api_base = Some(val);
    }
    if let Ok(val) = std::env::var("EVALGATE_PROVIDER__MODEL") {
        config.provider.model = val;
    }
    if let Ok(val) = std::env::var("EVALGATE_PROVIDER__TIMEOUT_SECONDS") {
        if let Ok(n) = val.parse::<u64>() {
            config.provider.timeout_seconds = n;
        }
    }
    if let Ok(val) = std::env::var("EVALGATE_PROVIDER__VALIDATE_TIMEOUT_SECONDS") {
        if let Ok(n) = val.parse::<u64>() {
            config.provider.validate_timeout_seconds = n;
        }
    }
    if let Ok(val) = std::env::var("EVALGATE_PROVIDER__MAX_OUTPUT_TOKENS") {
        if let Ok(n) = val.parse::<u32>() {
            config.provider.max_output_tokens = n;
        }
    }

    if let Ok(val) = std::env::var("EVALGATE_ADMIN__TOKEN") {
        config.admin.token = val;
    }

    if let Ok(val) = std::env::var("EVALGATE_LIMITS__MAX_FIELD_CHARS") {
        if let Ok(n) = val.parse::<usize>() {
            config.limits.max_field_chars = n;
        }
    }

    config
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
