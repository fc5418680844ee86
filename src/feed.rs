// src/feed.rs
//! Announcement feed fetching and RSS parsing.
//!
//! The feed endpoint is plain RSS with no auth but rejects non-browser
//! user agents, so the fetcher sends a browser-like header. All failures
//! degrade to an empty entry list; a broken feed poll must never abort a run.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quick_xml::de::from_str;
use serde::Deserialize;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEntry {
    pub title: String,
    pub summary: Option<String>,
    pub link: String,
    pub published: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Fetch and parse the feed. Degrades to an empty vec on failure.
    async fn fetch_entries(&self) -> Vec<FeedEntry>;
}

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}
#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}
#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
}

fn parse_rfc2822(ts: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(ts.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Bare `&` and friends inside titles break strict XML parsing.
fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
}

/// Parse an RSS body into entries. Items without a link are dropped since
/// everything downstream needs the filing document URL.
pub fn parse_feed_str(body: &str) -> Result<Vec<FeedEntry>> {
    let xml_clean = scrub_html_entities_for_xml(body);
    let rss: Rss = from_str(&xml_clean).context("parsing announcements rss xml")?;

    let mut out = Vec::with_capacity(rss.channel.item.len());
    for it in rss.channel.item {
        let link = match it.link {
            Some(l) if !l.trim().is_empty() => l.trim().to_string(),
            _ => continue,
        };
        let title = html_escape::decode_html_entities(it.title.as_deref().unwrap_or_default())
            .trim()
            .to_string();
        let summary = it.description.as_deref().map(|d| {
            html_escape::decode_html_entities(d).trim().to_string()
        });
        out.push(FeedEntry {
            title,
            summary,
            link,
            published: it.pub_date.as_deref().and_then(parse_rfc2822),
        });
    }
    Ok(out)
}

pub struct RssFeedSource {
    url: String,
    user_agent: String,
    client: reqwest::Client,
}

impl RssFeedSource {
    pub fn new(url: String, user_agent: String) -> Self {
        Self {
            url,
            user_agent,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl FeedSource for RssFeedSource {
    async fn fetch_entries(&self) -> Vec<FeedEntry> {
        info!(url = %self.url, "fetching announcements feed");
        let resp = match self
            .client
            .get(&self.url)
            .header(reqwest::header::USER_AGENT, &self.user_agent)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                warn!(error = ?e, "feed fetch transport error");
                return Vec::new();
            }
        };
        if !resp.status().is_success() {
            warn!(status = %resp.status(), "feed fetch non-success status");
            return Vec::new();
        }
        let body = match resp.text().await {
            Ok(b) => b,
            Err(e) => {
                warn!(error = ?e, "feed body read error");
                return Vec::new();
            }
        };
        match parse_feed_str(&body) {
            Ok(entries) => {
                info!(count = entries.len(), "feed entries fetched");
                entries
            }
            Err(e) => {
                warn!(error = ?e, "feed parse error");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0"?>
<rss version="2.0"><channel>
  <title>Online Announcements</title>
  <item>
    <title>Acme Ltd &ndash; Analyst Meet</title>
    <link>https://archives.example/acme.pdf</link>
    <description>Schedule of institutional investor meet</description>
    <pubDate>Fri, 15 Mar 2024 09:00:00 +0530</pubDate>
  </item>
  <item>
    <title>No Link Corp update</title>
    <description>dropped</description>
  </item>
</channel></rss>"#;

    #[test]
    fn parses_items_and_drops_linkless() {
        let entries = parse_feed_str(SAMPLE).unwrap();
        assert_eq!(entries.len(), 1);
        let e = &entries[0];
        assert_eq!(e.title, "Acme Ltd - Analyst Meet");
        assert_eq!(e.link, "https://archives.example/acme.pdf");
        assert_eq!(
            e.summary.as_deref(),
            Some("Schedule of institutional investor meet")
        );
        assert!(e.published.is_some());
    }

    #[test]
    fn pub_date_converts_to_utc() {
        let entries = parse_feed_str(SAMPLE).unwrap();
        let dt = entries[0].published.unwrap();
        // 09:00 +05:30 is 03:30 UTC
        assert_eq!(dt.to_rfc3339(), "2024-03-15T03:30:00+00:00");
    }

    #[test]
    fn malformed_body_is_an_error() {
        assert!(parse_feed_str("not xml at all").is_err());
    }
}
