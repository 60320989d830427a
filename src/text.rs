use std::sync::LazyLock;

use regex::Regex;

static DIGITS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").unwrap());
static PAREN_GROUP_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\(([^)]*)\)").unwrap());
static TRAILING_INT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+)\s*$").unwrap());
static YEAR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d{4}").unwrap());

/// Collapse runs of whitespace into single spaces and trim.
pub fn collapse_whitespace(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Canonical form of every catalog key and attribute value.
pub fn normalize(raw: &str) -> String {
    collapse_whitespace(raw).to_lowercase()
}

/// First contiguous digit run after removing thousands separators.
///
/// `None` when the text has no digits or the run overflows `u64`.
pub fn leading_integer(text: &str) -> Option<u64> {
    let stripped = text.replace(',', "");
    DIGITS_RE.find(&stripped)?.as_str().parse().ok()
}

/// Integer ending the first parenthesized group, e.g. the neighbor count in
/// `"border countries (1): south africa"` or `"12 (see note - 1)"`.
///
/// Only the first group is read; if it does not end in a number there is
/// no count.
pub fn parenthesized_integer(text: &str) -> Option<u64> {
    let stripped = text.replace(',', "");
    let group = PAREN_GROUP_RE.captures(&stripped)?.get(1)?.as_str();
    TRAILING_INT_RE.captures(group)?.get(1)?.as_str().parse().ok()
}

/// First four-digit token, read as a year.
pub fn first_year(text: &str) -> Option<u32> {
    YEAR_RE.find(text)?.as_str().parse().ok()
}

// ── Tests ──
