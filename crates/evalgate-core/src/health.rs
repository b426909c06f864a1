//! Process-wide provider readiness state.
//!
//! One [`Health`] instance lives for the whole process. Request handling and
//! the health monitor both write to it; concurrent writers are serialized by
//! the lock and last-writer-wins is acceptable. The lock is a plain
//! `std::sync::RwLock` — it is never held across an await point.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::RwLock;

use crate::error::ReasonCode;

/// Point-in-time view of provider health, as returned by `GET /health`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HealthSnapshot {
    /// Configured enablement flag. Mirrors configuration truthfully; a
    /// missing credential does not flip it.
    pub ai_enabled: bool,
    /// Model identifier in use.
    pub model: String,
    /// Provider name.
    pub provider: String,
    /// When the provider was last contacted (validation or evaluation).
    pub last_check_at: Option<DateTime<Utc>>,
    /// Reason code of the last failure, cleared on success.
    pub last_error: Option<ReasonCode>,
}

#[derive(Debug)]
struct Mutable {
    last_check_at: Option<DateTime<Utc>>,
    last_error: Option<ReasonCode>,
}

/// Shared health state.
#[derive(Debug)]
pub struct Health {
    ai_enabled: bool,
    model: String,
    provider: String,
    state: RwLock<Mutable>,
}

impl Health {
    /// Create health state from static configuration. `last_check_at` and
    /// `last_error` start empty until the first validation runs.
    pub fn new(ai_enabled: bool, model: impl Into<String>, provider: impl Into<String>) -> Self {
        Health {
            ai_enabled,
            model: model.into(),
            provider: provider.into(),
            state: RwLock::new(Mutable {
                last_check_at: None,
                last_error: None,
            }),
        }
    }

    /// Record a completed provider interaction that succeeded.
    pub fn record_success(&self) {
        let mut state = self.state.write().expect("health lock poisoned");
        state.last_error = None;
        state.last_check_at = Some(Utc::now());
    }

    /// Record a completed provider interaction that failed.
    pub fn record_failure(&self, reason: ReasonCode) {
        let mut state = self.state.write().expect("health lock poisoned");
        state.last_error = Some(reason);
        state.last_check_at = Some(Utc::now());
    }

    /// Set `last_error` without touching the timestamp. Used at startup when
    /// no provider contact has happened yet (disabled flag, missing key).
    pub fn mark(&self, reason: Option<ReasonCode>) {
        let mut state = self.state.write().expect("health lock poisoned");
        state.last_error = reason;
    }

    /// The last recorded failure reason, if any.
    pub fn last_error(&self) -> Option<ReasonCode> {
        self.state.read().expect("health lock poisoned").last_error
    }

    /// Current snapshot for the health endpoint.
    pub fn snapshot(&self) -> HealthSnapshot {
        let state = self.state.read().expect("health lock poisoned");
        HealthSnapshot {
            ai_enabled: self.ai_enabled,
            model: self.model.clone(),
            provider: self.provider.clone(),
            last_check_at: state.last_check_at,
            last_error: state.last_error,
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
    fn test_initial_state() {
        let health = Health::new(true, "gpt-4o-mini", "openai");
        let snap = health.snapshot();
        assert!(snap.ai_enabled);
        assert_eq!(snap.model, "gpt-4o-mini");
        assert_eq!(snap.provider, "openai");
        assert!(snap.last_check_at.is_none());
        assert!(snap.last_error.is_none());
    }

    #[test]
    fn test_success_clears_error_and_stamps() {
        let health = Health::new(true, "m", "p");
        health.record_failure(ReasonCode::RateLimited);
        assert_eq!(health.last_error(), Some(ReasonCode::RateLimited));

        health.record_success();
        let snap = health.snapshot();
        assert!(snap.last_error.is_none());
        assert!(snap.last_check_at.is_some());
    }

    #[test]
    fn test_failure_sets_reason() {
        let health = Health::new(true, "m", "p");
        health.record_failure(ReasonCode::ParseError);
        let snap = health.snapshot();
        assert_eq!(snap.last_error, Some(ReasonCode::ParseError));
        assert!(snap.last_check_at.is_some());
    }

    #[test]
    fn test_mark_does_not_stamp() {
        let health = Health::new(true, "m", "p");
        health.mark(Some(ReasonCode::MissingKey));
        let snap = health.snapshot();
        assert_eq!(snap.last_error, Some(ReasonCode::MissingKey));
        assert!(snap.last_check_at.is_none());
    }

    #[test]
    fn test_snapshot_serialization() {
        let health = Health::new(false, "m", "openai");
        health.mark(Some(ReasonCode::AiDisabled));
        let json = serde_json::to_value(health.snapshot()).unwrap();
        assert_eq!(json["ai_enabled"], serde_json::json!(false));
        assert_eq!(json["last_error"], serde_json::json!("ai_disabled"));
        assert_eq!(json["last_check_at"], serde_json::Value::Null);
    }

    #[test]
    fn test_concurrent_writers_do_not_corrupt() {
        use std::sync::Arc;
        let health = Arc::new(Health::new(true, "m", "p"));
        let mut handles = Vec::new();
        for i in 0..8 {
            let h = health.clone();
            handles.push(std::thread::spawn(move || {
                if i % 2 == 0 {
                    h.record_success();
                } else {
                    h.record_failure(ReasonCode::Timeout);
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        // Last writer wins; whatever it was, the state is coherent.
        let snap = health.snapshot();
        assert!(snap.last_check_at.is_some());
        assert!(snap.last_error.is_none() || snap.last_error == Some(ReasonCode::Timeout));
    }
}
