// src/config.rs
//! Run configuration: a TOML file with serde defaults, plus a couple of env
//! overrides. Every component takes its settings from here instead of
//! reaching for globals.

use anyhow::{Context, Result};
use chrono_tz::Tz;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::event::{DEFAULT_DATETIME_FORMAT, DEFAULT_DURATION_MINS};
use crate::matcher::{DEFAULT_KEYWORDS, DEFAULT_THRESHOLD};

pub const DEFAULT_CONFIG_PATH: &str = "config/concall.toml";
pub const ENV_CONFIG_PATH: &str = "CONCALL_CONFIG_PATH";
pub const ENV_GUEST_EMAIL: &str = "GCAL_GUEST_EMAIL";
pub const ENV_ACCESS_TOKEN: &str = "GCAL_ACCESS_TOKEN";

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub feed: FeedCfg,
    pub watchlist: WatchlistCfg,
    pub matcher: MatcherCfg,
    pub extractor: ExtractorCfg,
    pub calendar: CalendarCfg,
    pub ledger: LedgerCfg,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FeedCfg {
    pub url: String,
    pub user_agent: String,
}

impl Default for FeedCfg {
    fn default() -> Self {
        Self {
            url: "https://nsearchives.nseindia.com/content/RSS/Online_announcements.xml"
                .to_string(),
            user_agent: "Mozilla/5.0".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WatchlistCfg {
    pub path: PathBuf,
}

impl Default for WatchlistCfg {
    fn default() -> Self {
        Self {
            path: PathBuf::from("companies.txt"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MatcherCfg {
    pub threshold: u8,
    pub keywords: Vec<String>,
    /// Only act on announcements dated in the future, newest first.
    pub future_only: bool,
    /// Process only the first match per company (the original behaviour)
    /// instead of every match.
    pub first_match_only: bool,
}

impl Default for MatcherCfg {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            keywords: DEFAULT_KEYWORDS.iter().map(|s| s.to_string()).collect(),
            future_only: false,
            first_match_only: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExtractorCfg {
    pub max_attempts: u32,
    pub backoff_base_secs: u64,
    pub connect_timeout_secs: u64,
    pub read_timeout_secs: u64,
    pub user_agent: String,
}

impl Default for ExtractorCfg {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base_secs: 2,
            connect_timeout_secs: 10,
            read_timeout_secs: 90,
            user_agent: "Mozilla/5.0 (compatible; ConcallFilingsBot/1.0)".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CalendarCfg {
    pub calendar_id: String,
    pub timezone: String,
    pub datetime_format: String,
    pub event_duration_mins: i64,
    pub guest_email: Option<String>,
}

impl Default for CalendarCfg {
    fn default() -> Self {
        Self {
            calendar_id: "primary".to_string(),
            timezone: "Asia/Kolkata".to_string(),
            datetime_format: DEFAULT_DATETIME_FORMAT.to_string(),
            event_duration_mins: DEFAULT_DURATION_MINS,
            guest_email: None,
        }
    }
}

impl CalendarCfg {
    pub fn tz(&self) -> Result<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|e| anyhow::anyhow!("invalid timezone `{}`: {e}", self.timezone))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LedgerCfg {
    pub enabled: bool,
    pub path: PathBuf,
}

impl Default for LedgerCfg {
    fn default() -> Self {
        Self {
            enabled: true,
            path: PathBuf::from("processed_events.json"),
        }
    }
}

impl AppConfig {
    /// Resolve the config path from $CONCALL_CONFIG_PATH, falling back to
    /// `config/concall.toml`. A missing file yields pure defaults; a present
    /// but invalid file is an error.
    pub fn load() -> Result<Self> {
        let path = std::env::var(ENV_CONFIG_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));
        let mut cfg = if path.exists() {
            Self::from_path(&path)?
        } else {
            Self::default()
        };
        cfg.apply_env_overrides();
        Ok(cfg)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let cfg: AppConfig = toml::from_str(s).context("parsing config toml")?;
        Ok(cfg)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(email) = std::env::var(ENV_GUEST_EMAIL) {
            let email = email.trim().to_string();
            if !email.is_empty() {
                self.calendar.guest_email = Some(email);
            }
        }
    }
}
