//! Strips in-note trigger syntax from reminder text.
//!
//! `:@2025-03-01,09:00` (time) and `:#Home` / `:#"Coffee shop"` (location)
//! are authoring syntax and must never reach the backend.

use std::sync::LazyLock;

use regex::Regex;

static TRIGGER_SYNTAX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#":@\S*|:#"[^"]*"|:#\S*"#).expect("trigger syntax regex")
});

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace regex"));

/// Remove trigger syntax and collapse whitespace.
pub fn clean_message(message: &str) -> String {
    let stripped = TRIGGER_SYNTAX.replace_all(message, " ");
    WHITESPACE.replace_all(&stripped, " ").trim().to_string()
}
