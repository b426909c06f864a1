//! JSON extraction from raw provider output.
//!
//! Models that were asked for "only JSON" still wrap their answer in prose or
//! code fences often enough that a single `serde_json::from_str` is not good
//! enough. [`extract_json`] runs an ordered chain of strategies, stopping at
//! the first one that yields a JSON object:
//!
//! 1. the whole text parsed directly
//! 2. a fenced block explicitly labeled `json`
//! 3. any fenced block
//! 4. the last `{...}` block anchored to the end of the text
//! 5. the first `{...}` block
//!
//! Explicit signaling wins over heuristics, and the *last* brace block is
//! preferred over the first because explanatory prose tends to precede the
//! structured answer. Each strategy is a pure function; the chain has no
//! hidden state, so parsing the same text twice gives the same result.

use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;

/// A parsed JSON object.
pub type JsonObject = Map<String, Value>;

/// One extraction attempt: raw text in, JSON object out (or nothing).
type Strategy = fn(&str) -> Option<JsonObject>;

static LABELED_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?si)```json\s*(.*?)\s*```").unwrap());
static ANY_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```\s*(.*?)\s*```").unwrap());
static LAST_BRACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\{.*\}\s*$").unwrap());
static FIRST_BRACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\{.*?\}").unwrap());

/// The chain, in priority order.
const STRATEGIES: &[Strategy] = &[
    parse_direct,
    parse_labeled_fence,
    parse_any_fence,
    parse_last_brace,
    parse_first_brace,
];

/// Extract a JSON object from raw provider output.
///
/// Returns `None` only when every strategy fails. Non-object JSON values
/// (`42`, `"ok"`, arrays) are rejected: every consumer indexes the result by
/// key, so anything else is not a usable answer.
pub fn extract_json(raw: &str) -> Option<JsonObject> {
    STRATEGIES.iter().find_map(|strategy| strategy(raw))
}

/// Parse a candidate substring, keeping only JSON objects.
fn parse_object(candidate: &str) -> Option<JsonObject> {
    match serde_json::from_str::<Value>(candidate) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

fn parse_direct(raw: &str) -> Option<JsonObject> {
    parse_object(raw.trim())
}

fn parse_labeled_fence(raw: &str) -> Option<JsonObject> {
    LABELED_FENCE
        .captures(raw)
        .and_then(|c| parse_object(c.get(1)?.as_str()))
}

fn parse_any_fence(raw: &str) -> Option<JsonObject> {
    ANY_FENCE
        .captures(raw)
        .and_then(|c| parse_object(c.get(1)?.as_str()))
}

fn parse_last_brace(raw: &str) -> Option<JsonObject> {
    LAST_BRACE
        .find(raw)
        .and_then(|m| parse_object(m.as_str()))
}

fn parse_first_brace(raw: &str) -> Option<JsonObject> {
    FIRST_BRACE
        .find(raw)
        .and_then(|m| parse_object(m.as_str()))
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
