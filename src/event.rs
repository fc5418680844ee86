// src/event.rs
//! Calendar event payload composition.
//!
//! Start time comes from the extracted date + time pair parsed with a
//! configurable format; anything unparseable falls back to "now", so a
//! malformed filing still produces an event that a human can fix up.

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use tracing::warn;

use crate::extract::ExtractedFields;
use crate::matcher::MatchResult;

/// Marker appended to every description; identifies events created by this
/// pipeline for downstream dedup by humans or tooling.
pub const EVENT_TAG: &str = "[AUTO:NSE_RSS_SCRIPT]";

pub const DEFAULT_DATETIME_FORMAT: &str = "%d-%b-%Y %I:%M %p";
pub const DEFAULT_DURATION_MINS: i64 = 30;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct EventDateTime {
    #[serde(rename = "dateTime")]
    pub date_time: String,
    #[serde(rename = "timeZone")]
    pub time_zone: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Attendee {
    pub email: String,
}

/// Google Calendar `events.insert` request body.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CalendarEventPayload {
    pub summary: String,
    pub description: String,
    pub start: EventDateTime,
    pub end: EventDateTime,
    pub location: String,
    pub attendees: Vec<Attendee>,
}

pub struct EventComposer {
    tz: Tz,
    datetime_format: String,
    duration: Duration,
    /// Empty attendee list avoids a 403 on service accounts without
    /// domain-wide delegation; a configured guest email opts back in.
    guest_email: Option<String>,
}

impl EventComposer {
    pub fn new(tz: Tz, datetime_format: String, duration_mins: i64, guest_email: Option<String>) -> Self {
        Self {
            tz,
            datetime_format,
            duration: Duration::minutes(duration_mins),
            guest_email: guest_email.filter(|e| !e.trim().is_empty()),
        }
    }

    pub fn compose(
        &self,
        company: &str,
        matched: &MatchResult,
        fields: &ExtractedFields,
        now: DateTime<Utc>,
    ) -> CalendarEventPayload {
        let contacts = fields
            .contacts
            .iter()
            .cloned()
            .collect::<Vec<_>>()
            .join(", ");
        let description = format!(
            "Announcement link (PDF): {}\nDate: {}\nTime: {}\nDial-in info: {}\nRegistration link: {}\nHost: {}\nContacts: {}\n{}",
            matched.entry.link,
            fields.date,
            fields.time,
            fields.dial_in,
            fields.registration_link,
            fields.host,
            contacts,
            EVENT_TAG,
        );

        let start = self.start_time(fields, now);
        let end = start + self.duration;

        CalendarEventPayload {
            summary: format!("{} Analyst/Concall", company),
            description,
            start: self.event_datetime(start),
            end: self.event_datetime(end),
            location: "Virtual".to_string(),
            attendees: self
                .guest_email
                .iter()
                .map(|e| Attendee { email: e.clone() })
                .collect(),
        }
    }

    /// Parse `"{date} {time}"` with the configured format; local wall-clock
    /// in the configured timezone. Fallback is now-in-zone.
    fn start_time(&self, fields: &ExtractedFields, now: DateTime<Utc>) -> NaiveDateTime {
        let fallback = now.with_timezone(&self.tz).naive_local();
        if fields.date.is_empty() || fields.time.is_empty() {
            warn!("date/time missing from filing, using current time");
            return fallback;
        }
        let combined = format!("{} {}", fields.date.trim(), fields.time.trim());
        match NaiveDateTime::parse_from_str(&combined, &self.datetime_format) {
            Ok(dt) => dt,
            Err(e) => {
                warn!(error = %e, combined = %combined, "failed to parse date/time, using current time");
                fallback
            }
        }
    }

    fn event_datetime(&self, dt: NaiveDateTime) -> EventDateTime {
        EventDateTime {
            date_time: dt.format("%Y-%m-%dT%H:%M:%S").to_string(),
            time_zone: self.tz.name().to_string(),
        }
    }
}
