//! Normalization of a parsed provider payload into the result the backend
//! consumes.
//!
//! The provider is asked for `{total_score, passed, summary, meta}` but real
//! output drifts: scores arrive as strings or floats, `passed` goes missing,
//! the summary hides in a `feedback` field, and older prompt revisions taught
//! the model to embed a "manual review" marker instead of a score. All of
//! that is flattened here into either [`Normalized::ManualReview`] or a
//! well-formed [`EvaluationResult`].

use serde::Serialize;
use serde_json::{Map, Value};

use crate::config::NormalizationConfig;

/// Score at or above which a submission passes when the payload doesn't say.
const PASS_THRESHOLD: i64 = 50;

/// Summary used when the payload carries neither `summary` nor `feedback`.
const DEFAULT_SUMMARY: &str = "Evaluation completed";

// ─────────────────────────────────────────────
// EvaluationResult
// ─────────────────────────────────────────────

/// The normalized evaluation outcome returned to the caller.
///
/// Serialized with camelCase keys (`totalScore`, `aiDisabled`, …).
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationResult {
    pub total_score: i64,
    pub passed: bool,
    pub summary: String,
    /// Always `false` here — a disabled provider never reaches normalization.
    pub ai_disabled: bool,
    /// Present (and `true`) only when the provider produced no usable content
    /// and the safe fallback payload was substituted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_malformed: Option<bool>,
}

/// Outcome of normalizing a parsed payload.
#[derive(Clone, Debug, PartialEq)]
pub enum Normalized {
    /// The payload itself signaled "no automated judgment"; the caller must
    /// route the submission to a human.
    ManualReview,
    /// A well-formed result.
    Result(EvaluationResult),
}

// ─────────────────────────────────────────────
// Normalization
// ─────────────────────────────────────────────

/// Normalize a parsed provider payload.
///
/// Detects legacy manual-review signaling first (the recognized key set comes
/// from `rules`), then coerces the scoring fields:
/// - `total_score`: integer, accepting numbers and numeric strings, 0 on
///   coercion failure
/// - `passed`: taken from the payload, derived as `total_score >= 50` when
///   absent
/// - `summary`: `summary` then `feedback`, generic default when both missing
pub fn normalize_payload(payload: &Map<String, Value>, rules: &NormalizationConfig) -> Normalized {
    if signals_manual_review(payload, rules) {
        return Normalized::ManualReview;
    }

    let total_score = coerce_score(payload.get("total_score"));

    let passed = payload
        .get("passed")
        .and_then(Value::as_bool)
        .unwrap_or(total_score >= PASS_THRESHOLD);

    let summary = ["summary", "feedback"]
        .iter()
        .find_map(|key| payload.get(*key).and_then(Value::as_str))
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_SUMMARY)
        .to_string();

    let provider_malformed = payload
        .get("provider_malformed")
        .and_then(Value::as_bool)
        .filter(|flag| *flag);

    Normalized::Result(EvaluationResult {
        total_score,
        passed,
        summary,
        ai_disabled: false,
        provider_malformed,
    })
}

/// Whether the payload carries any recognized manual-review marker, at the
/// top level or under one of the configured metadata sub-objects.
fn signals_manual_review(payload: &Map<String, Value>, rules: &NormalizationConfig) -> bool {
    if object_has_marker(payload, rules) {
        return true;
    }
    rules.metadata_keys.iter().any(|key| {
        payload
            .get(key)
            .and_then(Value::as_object)
            .is_some_and(|meta| object_has_marker(meta, rules))
    })
}

fn object_has_marker(obj: &Map<String, Value>, rules: &NormalizationConfig) -> bool {
    let flag_set = rules
        .manual_review_flags
        .iter()
        .any(|key| obj.get(key).and_then(Value::as_bool) == Some(true));
    if flag_set {
        return true;
    }

    rules.manual_review_keys.iter().any(|key| {
        obj.get(key)
            .and_then(Value::as_str)
            .is_some_and(|v| rules.manual_review_values.iter().any(|m| m == v))
    })
}

/// Coerce a score value to an integer; 0 on any failure.
fn coerce_score(value: Option<&Value>) -> i64 {
    match value {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse::<i64>().unwrap_or(0),
        _ => 0,
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
