// src/normalize.rs
//! Text normalization used by the matcher and the field extractor.

use once_cell::sync::OnceCell;
use regex::Regex;

/// Normalize for matching: keep ASCII letters and digits only, lowercased.
/// Total and idempotent; punctuation, spacing and unicode noise all collapse
/// to nothing so fuzzy scores are stable across feed formatting changes.
pub fn normalize(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Like [`normalize`] but with word boundaries kept: every run of
/// non-alphanumerics becomes a single space. The keyword gate matches whole
/// words, so "meet" must not fire on "meeting".
pub fn normalize_words(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_space = false;
    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.push(c.to_ascii_lowercase());
        } else {
            pending_space = true;
        }
    }
    out
}

/// Collapse whitespace runs to single spaces and trim. Applied to extracted
/// PDF text before label patterns run, since the text layer carries layout
/// line breaks that would otherwise split labels from their values.
pub fn collapse_whitespace(text: &str) -> String {
    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").unwrap());
    re_ws.replace_all(text, " ").trim().to_string()
}
