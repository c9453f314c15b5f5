//! Query text handling shared by the local backends.

use regex::Regex;
use std::sync::LazyLock;

/// Anything outside letters and digits forces a term to be quoted.
static FTS5_SPECIAL_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\p{L}\p{N}]").expect("valid FTS5 escape pattern"));

/// Splits text into lowercase alphanumeric tokens.
static TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\p{L}\p{N}]+").expect("valid token pattern"));

/// Escape a term for FTS5 queries.
///
/// Terms containing anything but letters and digits are wrapped in quotes.
pub fn escape_fts5_term(term: &str) -> String {
    if FTS5_SPECIAL_CHARS.is_match(term) {
        let escaped = term.replace('"', "\"\"");
        format!("\"{}\"", escaped)
    } else {
        term.to_string()
    }
}

/// Build an FTS5 query string from a search expression.
///
/// Terms are OR-ed with prefix matching:
/// - "bench press" → `bench* OR press*`
/// - "t-bar row" → `"t-bar"* OR row*`
pub fn build_fts5_query(expression: &str) -> String {
    let expression = expression.trim().to_lowercase();

    expression
        .split_whitespace()
        .map(escape_fts5_term)
        .filter(|t| !t.is_empty())
        .map(|t| format!("{}*", t))
        .collect::<Vec<_>>()
        .join(" OR ")
}

/// Lowercase word tokens of `text`.
pub fn tokenize(text: &str) -> Vec<String> {
    TOKEN
        .find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .collect()
}
