//! Input cleanup for submission fields.
//!
//! Free-text fields from the caller go straight into a provider prompt, so
//! they get control characters stripped and a hard length cap. The repository
//! URL is the one identifying field and must match a restrictive pattern
//! before any provider contact happens.

use regex::Regex;
use std::sync::LazyLock;

/// Runs of ASCII control characters (including DEL) collapse to one space.
static CONTROL_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\x00-\x1F\x7F]+").unwrap());

/// `https://github.com/owner/repo`, optional trailing slash, nothing else.
static REPO_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https://github\.com/[A-Za-z0-9_.-]+/[A-Za-z0-9_.-]+/?$").unwrap()
});

/// Strip control characters and cap the field at `max_chars` characters.
pub fn clean_text(input: &str, max_chars: usize) -> String {
    let cleaned = CONTROL_RUN.replace_all(input, " ");
    if cleaned.chars().count() <= max_chars {
        cleaned.into_owned()
    } else {
        cleaned.chars().take(max_chars).collect()
    }
}

/// Whether `url` is an acceptable repository URL.
pub fn is_valid_repo_url(url: &str) -> bool {
    REPO_URL.is_match(url)
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
