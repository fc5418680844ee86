// src/ledger.rs
//! Persisted idempotency ledger. The feed is re-fetched from scratch every
//! run, so without a record of processed announcements each run would create
//! duplicate events. The key hashes (company, document link).

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::fs;
use std::path::PathBuf;
use tracing::warn;

pub fn event_key(company: &str, link: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(company.as_bytes());
    hasher.update(b"|");
    hasher.update(link.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(24);
    for b in digest.iter().take(12) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

pub struct Ledger {
    path: PathBuf,
    keys: BTreeSet<String>,
}

impl Ledger {
    /// Load the ledger; a missing file starts empty, a corrupt file starts
    /// empty with a warning (worst case is a duplicate event, not a crash).
    pub fn open(path: PathBuf) -> Self {
        let keys = match fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str::<BTreeSet<String>>(&content) {
                Ok(k) => k,
                Err(e) => {
                    warn!(error = %e, path = %path.display(), "ledger file corrupt, starting empty");
                    BTreeSet::new()
                }
            },
            Err(_) => BTreeSet::new(),
        };
        Self { path, keys }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    /// Record a key and persist immediately, so a crash mid-run cannot
    /// replay events already created.
    pub fn record(&mut self, key: String) -> Result<()> {
        self.keys.insert(key);
        let content = serde_json::to_string_pretty(&self.keys)?;
        fs::write(&self.path, content)
            .with_context(|| format!("writing ledger to {}", self.path.display()))?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
