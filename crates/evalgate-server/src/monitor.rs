//! Provider readiness monitoring.
//!
//! [`run_validation`] is the single path that installs or clears the live
//! provider client: once at startup, again whenever the protected
//! revalidation endpoint fires, and once more when a health read observes a
//! stale `parse_error` (see [`ensure_fresh`]). The evaluation pipeline only
//! ever reads the installed handle.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use evalgate_core::ReasonCode;
use evalgate_provider::ProviderClient;

use crate::state::AppState;

/// Validate the configured provider and install a live client on success.
///
/// Failure clears the client slot, so evaluations short-circuit to manual
/// review until a later revalidation succeeds.
pub async fn run_validation(state: &AppState) {
    let provider = &state.config.provider;

    if !provider.enabled {
        info!("AI evaluation disabled by configuration");
        state.health.mark(Some(ReasonCode::AiDisabled));
        state.set_client(None);
        return;
    }
    if !provider.is_configured() {
        warn!("provider enabled but no API key configured");
        state.health.mark(Some(ReasonCode::MissingKey));
        state.set_client(None);
        return;
    }

    let client = match ProviderClient::new(provider) {
        Ok(client) => Arc::new(client),
        Err(err) => {
            error!(reason = %err.reason, "could not construct provider client");
            state.health.mark(Some(err.reason));
            state.set_client(None);
            return;
        }
    };

    let deadline = Duration::from_secs(provider.validate_timeout());
    match client.validate(deadline).await {
        Ok(()) => {
            info!(model = %provider.model, provider = %provider.name, "provider validated");
            state.set_client(Some(client));
            state.health.record_success();
        }
        Err(err) => {
            warn!(reason = %err.reason, message = %err.message, "provider validation failed");
            state.set_client(None);
            state.health.record_failure(err.reason);
        }
    }
}

/// Self-heal hook for health reads: a recorded `parse_error` may be a
/// one-off from a single bad completion, so it triggers one fresh
/// validation before the snapshot is taken.
pub async fn ensure_fresh(state: &AppState) {
    if state.health.last_error() == Some(ReasonCode::ParseError) {
        info!("health shows parse_error; revalidating before answering");
        run_validation(state).await;
    }
}

/// Whether a supplied admin token grants access. An unconfigured token
/// makes the admin surface permanently forbidden.
pub fn admin_authorized(state: &AppState, supplied: Option<&str>) -> bool {
    let admin = &state.config.admin;
    admin.is_configured() && supplied == Some(admin.token.as_str())
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
