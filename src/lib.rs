// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod config;
pub mod event;
pub mod extract;
pub mod feed;
pub mod ledger;
pub mod matcher;
pub mod normalize;
pub mod pipeline;
pub mod sink;
pub mod watchlist;

pub use crate::config::AppConfig;
pub use crate::event::{CalendarEventPayload, EventComposer};
pub use crate::extract::{ExtractedFields, FieldExtractor};
pub use crate::feed::{FeedEntry, FeedSource};
pub use crate::matcher::{MatchResult, Matcher};
pub use crate::pipeline::CompanyOutcome;
pub use crate::sink::EventSink;
