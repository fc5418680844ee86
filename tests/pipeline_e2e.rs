// tests/pipeline_e2e.rs
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use concall_watch::config::AppConfig;
use concall_watch::event::{CalendarEventPayload, EventComposer, EVENT_TAG};
use concall_watch::extract::{DocumentSource, FetchedDocument, FieldExtractor, RetryPolicy};
use concall_watch::feed::{FeedEntry, FeedSource};
use concall_watch::ledger::Ledger;
use concall_watch::pipeline::{run_once, CompanyOutcome};
use concall_watch::sink::EventSink;

struct MockFeed {
    entries: Vec<FeedEntry>,
}

#[async_trait]
impl FeedSource for MockFeed {
    async fn fetch_entries(&self) -> Vec<FeedEntry> {
        self.entries.clone()
    }
}

/// Serves a body that is not a real PDF; extraction degrades to empty
/// fields, which the composer must tolerate.
struct MockDocs {
    calls: AtomicUsize,
}

#[async_trait]
impl DocumentSource for MockDocs {
    async fn get(&self, _url: &str) -> Result<FetchedDocument> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(FetchedDocument {
            status: 200,
            body: b"not a pdf".to_vec(),
        })
    }
}

#[derive(Default)]
struct RecordingSink {
    inserted: Mutex<Vec<CalendarEventPayload>>,
    fail: bool,
}

#[async_trait]
impl EventSink for RecordingSink {
    async fn insert_event(&self, payload: &CalendarEventPayload) -> Result<()> {
        if self.fail {
            return Err(anyhow!("sink unavailable"));
        }
        self.inserted.lock().unwrap().push(payload.clone());
        Ok(())
    }
}

fn acme_entry() -> FeedEntry {
    FeedEntry {
        title: "Acme Ltd — Concall with Analysts".to_string(),
        summary: Some("institutional investors invited".to_string()),
        link: "https://archives.example/acme.pdf".to_string(),
        published: Some(Utc::now()),
    }
}

fn fixtures(cfg: &AppConfig) -> (FieldExtractor, EventComposer) {
    let extractor = FieldExtractor::new(
        Box::new(MockDocs {
            calls: AtomicUsize::new(0),
        }),
        RetryPolicy::default(),
    );
    let composer = EventComposer::new(
        cfg.calendar.tz().unwrap(),
        cfg.calendar.datetime_format.clone(),
        cfg.calendar.event_duration_mins,
        None,
    );
    (extractor, composer)
}

#[tokio::test]
async fn matched_company_gets_event_others_report_no_match() {
    let mut cfg = AppConfig::default();
    cfg.matcher.threshold = 90;
    let (extractor, composer) = fixtures(&cfg);
    let feed = MockFeed {
        entries: vec![acme_entry()],
    };
    let sink = RecordingSink::default();
    let companies = vec!["Acme Ltd".to_string(), "Globex Corp".to_string()];

    let outcomes = run_once(&cfg, &companies, &feed, &extractor, &composer, &sink, None).await;

    assert_eq!(outcomes.len(), 2);
    assert!(matches!(
        &outcomes[0],
        CompanyOutcome::EventCreated { company, .. } if company == "Acme Ltd"
    ));
    assert!(matches!(
        &outcomes[1],
        CompanyOutcome::NoMatch { company } if company == "Globex Corp"
    ));

    let inserted = sink.inserted.lock().unwrap();
    assert_eq!(inserted.len(), 1);
    assert_eq!(inserted[0].summary, "Acme Ltd Analyst/Concall");
    assert!(inserted[0]
        .description
        .starts_with("Announcement link (PDF): https://archives.example/acme.pdf"));
    assert!(inserted[0].description.ends_with(EVENT_TAG));
    assert!(inserted[0].attendees.is_empty());
}

#[tokio::test]
async fn sink_failure_is_recorded_and_scan_continues() {
    let mut cfg = AppConfig::default();
    cfg.matcher.threshold = 90;
    let (extractor, composer) = fixtures(&cfg);
    let feed = MockFeed {
        entries: vec![acme_entry()],
    };
    let sink = RecordingSink {
        fail: true,
        ..Default::default()
    };
    let companies = vec!["Acme Ltd".to_string(), "Globex Corp".to_string()];

    let outcomes = run_once(&cfg, &companies, &feed, &extractor, &composer, &sink, None).await;

    assert!(matches!(&outcomes[0], CompanyOutcome::Failed { company, .. } if company == "Acme Ltd"));
    // the failure did not stop the remaining companies
    assert!(matches!(&outcomes[1], CompanyOutcome::NoMatch { .. }));
}

#[tokio::test]
async fn ledger_prevents_duplicate_events_across_runs() {
    let mut cfg = AppConfig::default();
    cfg.matcher.threshold = 90;
    let tmp = tempfile::tempdir().unwrap();
    let ledger_path = tmp.path().join("processed.json");

    let feed = MockFeed {
        entries: vec![acme_entry()],
    };
    let sink = RecordingSink::default();
    let companies = vec!["Acme Ltd".to_string()];

    let (extractor, composer) = fixtures(&cfg);
    let mut ledger = Ledger::open(ledger_path.clone());
    let first = run_once(
        &cfg,
        &companies,
        &feed,
        &extractor,
        &composer,
        &sink,
        Some(&mut ledger),
    )
    .await;
    assert!(matches!(&first[0], CompanyOutcome::EventCreated { .. }));

    // fresh ledger handle, as a new process run would have
    let mut ledger = Ledger::open(ledger_path);
    let second = run_once(
        &cfg,
        &companies,
        &feed,
        &extractor,
        &composer,
        &sink,
        Some(&mut ledger),
    )
    .await;
    assert!(matches!(&second[0], CompanyOutcome::AlreadyProcessed { .. }));
    assert_eq!(sink.inserted.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn empty_feed_yields_no_match_for_every_company() {
    let cfg = AppConfig::default();
    let (extractor, composer) = fixtures(&cfg);
    let feed = MockFeed { entries: vec![] };
    let sink = RecordingSink::default();
    let companies = vec!["Acme Ltd".to_string(), "Globex Corp".to_string()];

    let outcomes = run_once(&cfg, &companies, &feed, &extractor, &composer, &sink, None).await;
    assert_eq!(outcomes.len(), 2);
    assert!(outcomes
        .iter()
        .all(|o| matches!(o, CompanyOutcome::NoMatch { .. })));
}
