// src/watchlist.rs
//! Watched company names from a plain text file: either comma-separated on
//! one blob or one name per line. Blank entries are dropped.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

pub fn load_watchlist(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading watchlist from {}", path.display()))?;
    Ok(parse_watchlist(&content))
}

pub fn parse_watchlist(content: &str) -> Vec<String> {
    let items: Vec<&str> = if content.contains(',') {
        content.split(',').collect()
    } else {
        content.lines().collect()
    };
    let mut out = Vec::new();
    for it in items {
        let t = it.trim();
        if !t.is_empty() && !out.iter().any(|s: &String| s == t) {
            out.push(t.to_string());
        }
    }
    out
}
