//! Concall Watch — Binary Entrypoint
//! One run: load config and watchlist, fetch the feed, create calendar
//! events for matched announcements, then exit.

use std::time::Duration;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use concall_watch::config::{AppConfig, ENV_ACCESS_TOKEN};
use concall_watch::event::EventComposer;
use concall_watch::extract::{FieldExtractor, HttpDocumentSource, RetryPolicy};
use concall_watch::feed::RssFeedSource;
use concall_watch::ledger::Ledger;
use concall_watch::pipeline;
use concall_watch::sink::GoogleCalendarSink;
use concall_watch::watchlist::load_watchlist;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = AppConfig::load()?;
    let tz = cfg.calendar.tz()?;

    let companies = load_watchlist(&cfg.watchlist.path)?;
    if companies.is_empty() {
        tracing::warn!(path = %cfg.watchlist.path.display(), "watchlist is empty, nothing to do");
        return Ok(());
    }
    tracing::info!(count = companies.len(), "watchlist loaded");

    // Sink construction is the one fatal path: without it no company can be
    // processed, so a missing token aborts the run here.
    let token = std::env::var(ENV_ACCESS_TOKEN).unwrap_or_default();
    let sink = GoogleCalendarSink::new(cfg.calendar.calendar_id.clone(), token)
        .map_err(|e| {
            tracing::error!(error = ?e, "calendar sink initialization failed");
            e
        })?;

    let feed = RssFeedSource::new(cfg.feed.url.clone(), cfg.feed.user_agent.clone());
    let source = HttpDocumentSource::new(
        cfg.extractor.user_agent.clone(),
        Duration::from_secs(cfg.extractor.connect_timeout_secs),
        Duration::from_secs(cfg.extractor.read_timeout_secs),
    )?;
    let extractor = FieldExtractor::new(
        Box::new(source),
        RetryPolicy {
            max_attempts: cfg.extractor.max_attempts,
            backoff_base_secs: cfg.extractor.backoff_base_secs,
        },
    );
    let composer = EventComposer::new(
        tz,
        cfg.calendar.datetime_format.clone(),
        cfg.calendar.event_duration_mins,
        cfg.calendar.guest_email.clone(),
    );
    let mut ledger = cfg
        .ledger
        .enabled
        .then(|| Ledger::open(cfg.ledger.path.clone()));

    pipeline::run_once(
        &cfg,
        &companies,
        &feed,
        &extractor,
        &composer,
        &sink,
        ledger.as_mut(),
    )
    .await;

    Ok(())
}
