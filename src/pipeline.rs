// src/pipeline.rs
//! Orchestrator: one feed fetch, then a sequential pass over watched
//! companies. Per-company failures are recorded as outcomes and never abort
//! the remaining companies.

use chrono::Utc;
use tracing::{error, info};

use crate::config::AppConfig;
use crate::event::EventComposer;
use crate::extract::FieldExtractor;
use crate::feed::FeedSource;
use crate::ledger::{event_key, Ledger};
use crate::matcher::Matcher;
use crate::sink::EventSink;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompanyOutcome {
    EventCreated { company: String, title: String },
    NoMatch { company: String },
    AlreadyProcessed { company: String, title: String },
    Failed { company: String, reason: String },
}

pub async fn run_once(
    cfg: &AppConfig,
    companies: &[String],
    feed: &dyn FeedSource,
    extractor: &FieldExtractor,
    composer: &EventComposer,
    sink: &dyn EventSink,
    mut ledger: Option<&mut Ledger>,
) -> Vec<CompanyOutcome> {
    let entries = feed.fetch_entries().await;
    info!(entries = entries.len(), companies = companies.len(), "starting company scan");

    let matcher = Matcher::new(
        cfg.matcher.threshold,
        &cfg.matcher.keywords,
        cfg.matcher.future_only,
    );

    let mut outcomes = Vec::new();
    for company in companies {
        let single = std::slice::from_ref(company);
        let matches = matcher.find_matches(&entries, single, Utc::now());
        if matches.is_empty() {
            info!(company = %company, "no analyst/concall announcement found");
            outcomes.push(CompanyOutcome::NoMatch {
                company: company.clone(),
            });
            continue;
        }

        let selected: &[_] = if cfg.matcher.first_match_only {
            &matches[..1]
        } else {
            &matches[..]
        };

        for matched in selected {
            let key = event_key(company, &matched.entry.link);
            if let Some(ledger) = ledger.as_deref() {
                if ledger.contains(&key) {
                    info!(company = %company, title = %matched.entry.title, "event already processed, skipping");
                    outcomes.push(CompanyOutcome::AlreadyProcessed {
                        company: company.clone(),
                        title: matched.entry.title.clone(),
                    });
                    continue;
                }
            }

            let fields = extractor.extract_fields(&matched.entry.link).await;
            let payload = composer.compose(company, matched, &fields, Utc::now());

            match sink.insert_event(&payload).await {
                Ok(()) => {
                    info!(company = %company, summary = %payload.summary, "event created");
                    if let Some(ledger) = ledger.as_deref_mut() {
                        if let Err(e) = ledger.record(key) {
                            error!(error = ?e, company = %company, "failed to persist ledger entry");
                        }
                    }
                    outcomes.push(CompanyOutcome::EventCreated {
                        company: company.clone(),
                        title: matched.entry.title.clone(),
                    });
                }
                Err(e) => {
                    error!(error = ?e, company = %company, "event creation failed");
                    outcomes.push(CompanyOutcome::Failed {
                        company: company.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }
    }

    let created = outcomes
        .iter()
        .filter(|o| matches!(o, CompanyOutcome::EventCreated { .. }))
        .count();
    let failed = outcomes
        .iter()
        .filter(|o| matches!(o, CompanyOutcome::Failed { .. }))
        .count();
    info!(created, failed, total = outcomes.len(), "run finished");
    outcomes
}
