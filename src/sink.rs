// src/sink.rs
//! Event sink: the external calendar service behind a single insert
//! operation. The Google implementation posts the payload to the calendar
//! API with a short retry loop; auth is a bearer token supplied out-of-band.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::info;

use crate::event::CalendarEventPayload;

#[async_trait]
pub trait EventSink: Send + Sync {
    async fn insert_event(&self, payload: &CalendarEventPayload) -> Result<()>;
}

#[derive(Clone)]
pub struct GoogleCalendarSink {
    client: Client,
    calendar_id: String,
    access_token: String,
    timeout: Duration,
    max_retries: u8,
}

impl GoogleCalendarSink {
    /// Fails when the token is empty; the run cannot do anything useful
    /// without a working sink, so this surfaces as a fatal error upstream.
    pub fn new(calendar_id: String, access_token: String) -> Result<Self> {
        if access_token.trim().is_empty() {
            return Err(anyhow!("calendar access token is empty"));
        }
        if calendar_id.trim().is_empty() {
            return Err(anyhow!("calendar id is empty"));
        }
        Ok(Self {
            client: Client::new(),
            calendar_id,
            access_token,
            timeout: Duration::from_secs(10),
            max_retries: 3,
        })
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    pub fn with_retries(mut self, retries: u8) -> Self {
        self.max_retries = retries;
        self
    }

    fn insert_url(&self) -> String {
        format!(
            "https://www.googleapis.com/calendar/v3/calendars/{}/events",
            self.calendar_id
        )
    }
}

#[async_trait]
impl EventSink for GoogleCalendarSink {
    async fn insert_event(&self, payload: &CalendarEventPayload) -> Result<()> {
        let url = self.insert_url();
        let mut attempt: u8 = 0;
        loop {
            attempt += 1;
            let res = self
                .client
                .post(&url)
                .bearer_auth(&self.access_token)
                .timeout(self.timeout)
                .json(payload)
                .send()
                .await;

            match res {
                Ok(rsp) => {
                    if let Err(e) = rsp.error_for_status_ref() {
                        if attempt < self.max_retries {
                            tokio::time::sleep(Duration::from_millis(500u64 << (attempt - 1)))
                                .await;
                            continue;
                        }
                        return Err(anyhow!("calendar insert HTTP error: {e}"));
                    }
                    info!(summary = %payload.summary, "calendar event created");
                    return Ok(());
                }
                Err(e) => {
                    if attempt < self.max_retries {
                        tokio::time::sleep(Duration::from_millis(500u64 << (attempt - 1))).await;
                        continue;
                    }
                    return Err(anyhow!("calendar insert request failed: {e}"));
                }
            }
        }
    }
}
