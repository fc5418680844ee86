// src/matcher.rs
//! Fuzzy matching of feed entries against watched company names.
//!
//! Similarity runs against the title only; the keyword gate runs against
//! title + summary. Titles are the authoritative identifier field while
//! summaries are noisy, so the two scopes are deliberately different. The
//! gate matches whole-word keyword phrases so that "Board Meeting" does not
//! slip through on the "meet" keyword.

use chrono::{DateTime, Utc};
use strsim::normalized_levenshtein;
use tracing::info;

use crate::feed::FeedEntry;
use crate::normalize::{normalize, normalize_words};

/// Meeting/call terms that gate a match. A high name score alone is not
/// enough; board meetings, results and the like must not produce events.
pub const DEFAULT_KEYWORDS: &[&str] = &[
    "analyst",
    "analysts",
    "institutional",
    "investor",
    "concall",
    "conference call",
    "conferencecall",
    "meet",
    "call",
    "meet/concall",
];

pub const DEFAULT_THRESHOLD: u8 = 98;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchResult {
    pub entry: FeedEntry,
    pub company: String,
    pub score: u8,
}

/// Substring-tolerant similarity in 0..=100: the shorter string slides over
/// same-length windows of the longer one and the best normalized Levenshtein
/// similarity wins. Inputs are expected pre-normalized (ASCII alphanumerics),
/// which makes byte-index windowing safe.
pub fn partial_ratio(a: &str, b: &str) -> u8 {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    let n = short.len();
    let mut best = 0.0f64;
    for start in 0..=(long.len() - n) {
        let window = &long[start..start + n];
        let sim = normalized_levenshtein(short, window);
        if sim > best {
            best = sim;
            if best >= 1.0 {
                break;
            }
        }
    }
    (best * 100.0).round() as u8
}

pub struct Matcher {
    threshold: u8,
    /// Space-padded normalized keyword phrases for whole-word containment.
    /// Whole-word, not raw substring: "meet" must gate "Investor Meet" but
    /// not "Board Meeting".
    keywords_padded: Vec<String>,
    /// When set, only entries published strictly after evaluation time
    /// qualify, and results come back most-recent-first.
    future_only: bool,
}

impl Matcher {
    pub fn new(threshold: u8, keywords: &[String], future_only: bool) -> Self {
        let keywords_padded = keywords
            .iter()
            .map(|k| normalize_words(k))
            .filter(|k| !k.is_empty())
            .map(|k| format!(" {k} "))
            .collect();
        Self {
            threshold,
            keywords_padded,
            future_only,
        }
    }

    pub fn with_defaults() -> Self {
        let kw: Vec<String> = DEFAULT_KEYWORDS.iter().map(|s| s.to_string()).collect();
        Self::new(DEFAULT_THRESHOLD, &kw, false)
    }

    /// Match entries against watched names. Each entry matches at most one
    /// name (first-match short-circuit), so alias lists cannot produce
    /// duplicate events for a single announcement.
    pub fn find_matches(
        &self,
        entries: &[FeedEntry],
        companies: &[String],
        now: DateTime<Utc>,
    ) -> Vec<MatchResult> {
        let mut matches = Vec::new();

        for entry in entries {
            if self.future_only {
                match entry.published {
                    Some(ts) if ts > now => {}
                    _ => continue,
                }
            }

            let title_norm = normalize(&entry.title);
            let corpus = format!(
                " {} {} ",
                normalize_words(&entry.title),
                normalize_words(entry.summary.as_deref().unwrap_or_default())
            );
            let key_hit = self
                .keywords_padded
                .iter()
                .any(|k| corpus.contains(k.as_str()));
            if !key_hit {
                continue;
            }

            for company in companies {
                let score = partial_ratio(&normalize(company), &title_norm);
                if score >= self.threshold {
                    info!(
                        company = %company,
                        title = %entry.title,
                        score,
                        "matched announcement"
                    );
                    matches.push(MatchResult {
                        entry: entry.clone(),
                        company: company.clone(),
                        score,
                    });
                    break;
                }
            }
        }

        if self.future_only {
            matches.sort_by(|a, b| b.entry.published.cmp(&a.entry.published));
        }
        matches
    }
}
