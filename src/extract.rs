// src/extract.rs
//! Filing document download and best-effort field extraction.
//!
//! The download goes through a `DocumentSource` seam so the retry policy can
//! be exercised without a network. Field extraction is an ordered table of
//! label-anchored patterns over the whitespace-flattened text layer; a field
//! that does not match stays an empty string, never an error.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use once_cell::sync::OnceCell;
use regex::Regex;
use std::collections::BTreeSet;
use std::io::Write;
use std::time::Duration;
use tracing::{info, warn};

use crate::normalize::collapse_whitespace;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedFields {
    pub date: String,
    pub time: String,
    pub dial_in: String,
    pub registration_link: String,
    pub host: String,
    pub contacts: BTreeSet<String>,
}

impl ExtractedFields {
    pub fn empty() -> Self {
        Self::default()
    }
}

/// One HTTP exchange against the document host.
#[derive(Debug, Clone)]
pub struct FetchedDocument {
    pub status: u16,
    pub body: Vec<u8>,
}

#[async_trait]
pub trait DocumentSource: Send + Sync {
    async fn get(&self, url: &str) -> Result<FetchedDocument>;
}

/// Production source: reqwest with separate connect and total timeouts.
pub struct HttpDocumentSource {
    client: reqwest::Client,
    user_agent: String,
}

impl HttpDocumentSource {
    pub fn new(user_agent: String, connect_timeout: Duration, read_timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(read_timeout)
            .build()
            .context("building document http client")?;
        Ok(Self { client, user_agent })
    }
}

#[async_trait]
impl DocumentSource for HttpDocumentSource {
    async fn get(&self, url: &str) -> Result<FetchedDocument> {
        let resp = self
            .client
            .get(url)
            .header(reqwest::header::USER_AGENT, &self.user_agent)
            .header(reqwest::header::ACCEPT, "application/pdf")
            .send()
            .await
            .context("document request failed")?;
        let status = resp.status().as_u16();
        let body = resp.bytes().await.context("reading document body")?.to_vec();
        Ok(FetchedDocument { status, body })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff_base_secs: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base_secs: 2,
        }
    }
}

fn is_retryable(status: u16) -> bool {
    status == 429 || (500..600).contains(&status)
}

pub struct FieldExtractor {
    source: Box<dyn DocumentSource>,
    retry: RetryPolicy,
}

impl FieldExtractor {
    pub fn new(source: Box<dyn DocumentSource>, retry: RetryPolicy) -> Self {
        Self { source, retry }
    }

    /// Download the document and pull structured fields. Never fails: any
    /// fetch or parse problem degrades to all-empty fields with a warning.
    pub async fn extract_fields(&self, url: &str) -> ExtractedFields {
        info!(url = %url, "downloading filing document");
        let body = match self.fetch_with_retry(url).await {
            Ok(b) => b,
            Err(e) => {
                warn!(error = ?e, url = %url, "document fetch gave up");
                return ExtractedFields::empty();
            }
        };
        match extract_pdf_text(&body) {
            Ok(text) => parse_fields_from_text(&text),
            Err(e) => {
                warn!(error = ?e, url = %url, "pdf text extraction failed");
                ExtractedFields::empty()
            }
        }
    }

    /// The bounded retry loop: retries 429/5xx and transport errors with
    /// exponential backoff, fails fast on other statuses.
    pub async fn fetch_with_retry(&self, url: &str) -> Result<Vec<u8>> {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match self.source.get(url).await {
                Ok(doc) if (200..300).contains(&doc.status) => {
                    info!(attempt, bytes = doc.body.len(), "document downloaded");
                    return Ok(doc.body);
                }
                Ok(doc) if is_retryable(doc.status) => {
                    warn!(status = doc.status, attempt, "retryable document status");
                    if attempt >= self.retry.max_attempts {
                        return Err(anyhow!(
                            "document fetch failed after {attempt} attempts (last status {})",
                            doc.status
                        ));
                    }
                }
                Ok(doc) => {
                    return Err(anyhow!("document fetch non-retryable status {}", doc.status));
                }
                Err(e) => {
                    warn!(error = ?e, attempt, "document fetch transport error");
                    if attempt >= self.retry.max_attempts {
                        return Err(e.context(format!("document fetch failed after {attempt} attempts")));
                    }
                }
            }
            let backoff = Duration::from_secs(self.retry.backoff_base_secs << (attempt - 1));
            tokio::time::sleep(backoff).await;
        }
    }
}

/// Write the bytes to a scoped temp file and read every page's text. The
/// temp file is removed on drop, on both success and failure paths.
fn extract_pdf_text(body: &[u8]) -> Result<String> {
    let mut tmp = tempfile::Builder::new()
        .suffix(".pdf")
        .tempfile()
        .context("creating temp pdf")?;
    tmp.write_all(body).context("writing temp pdf")?;
    tmp.flush().context("flushing temp pdf")?;
    let text = pdf_extract::extract_text(tmp.path()).context("extracting pdf text")?;
    Ok(text)
}

struct FieldRule {
    name: &'static str,
    primary: Regex,
    fallback: Option<Regex>,
}

fn field_rules() -> &'static Vec<FieldRule> {
    static RULES: OnceCell<Vec<FieldRule>> = OnceCell::new();
    RULES.get_or_init(|| {
        let rule = |name, primary: &str, fallback: Option<&str>| FieldRule {
            name,
            primary: Regex::new(primary).unwrap(),
            fallback: fallback.map(|p| Regex::new(p).unwrap()),
        };
        vec![
            // Primary capture matches the datetime format the composer
            // parses; fallback keeps the long-month shape some issuers use.
            rule(
                "date",
                r"(?i)date[:\-\s]*(\d{1,2}-[A-Za-z]{3}-\d{4})",
                Some(r"(?i)date[:\-\s]*([A-Za-z]{3,9}\s+\d{1,2},?\s+\d{4})"),
            ),
            rule(
                "time",
                r"(?i)(?:at|time)[:\-\s]*(\d{1,2}:\d{2}\s*(?:AM|PM|IST)?)",
                None,
            ),
            // Captures are bounded: the source text has no newlines after
            // whitespace collapsing, so an open-ended capture would swallow
            // the rest of the document.
            rule(
                "dial_in",
                r"(?i)((?:dial[\s\-]*in|universal access)[:\-\s]*.{1,100})",
                None,
            ),
            rule(
                "registration_link",
                r"(?i)registration\s*link[:\-\s]*(https?://\S+)",
                Some(r"(?i)(https?://\S*diamondpass\S*)"),
            ),
            rule(
                "host",
                r"(?i)(?:hosted\s*by|moderator|organised\s*by)[:\-\s]*(.{1,80})",
                None,
            ),
        ]
    })
}

fn contact_patterns() -> &'static (Regex, Regex) {
    static PATTERNS: OnceCell<(Regex, Regex)> = OnceCell::new();
    PATTERNS.get_or_init(|| {
        (
            Regex::new(r"[\w.\-]+@[\w.\-]+\.\w+").unwrap(),
            Regex::new(r"\+?\d[\d\s\-()]{7,}\d").unwrap(),
        )
    })
}

/// Run the rule table against raw extracted text. Empty or whitespace-only
/// text short-circuits to all-empty fields (scanned documents without a text
/// layer land here).
pub fn parse_fields_from_text(raw_text: &str) -> ExtractedFields {
    let text = collapse_whitespace(raw_text);
    if text.is_empty() {
        warn!("document has no extractable text layer");
        return ExtractedFields::empty();
    }

    let mut fields = ExtractedFields::empty();
    for rule in field_rules() {
        let captured = rule
            .primary
            .captures(&text)
            .or_else(|| rule.fallback.as_ref().and_then(|re| re.captures(&text)))
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_default();
        match rule.name {
            "date" => fields.date = captured,
            "time" => fields.time = captured,
            "dial_in" => fields.dial_in = captured,
            "registration_link" => fields.registration_link = captured,
            "host" => fields.host = captured,
            _ => {}
        }
    }

    let (re_email, re_phone) = contact_patterns();
    for m in re_email.find_iter(&text) {
        fields.contacts.insert(m.as_str().to_string());
    }
    for m in re_phone.find_iter(&text) {
        fields.contacts.insert(m.as_str().trim().to_string());
    }

    info!(
        date = %fields.date,
        time = %fields.time,
        contacts = fields.contacts.len(),
        "extracted document fields"
    );
    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "Intimation of Investor Concall\n\
        Date: 15-Mar-2024   Time: 10:30 AM IST\n\
        Dial-in: +91 22 6280 1144 (primary)\n\
        Registration link: https://services.diamondpass.net/register/12345\n\
        Hosted by: Globex Advisors\n\
        Contact: ir@acme.example or call +91 98765 43210\n\
        Contact: ir@acme.example";

    #[test]
    fn extracts_labelled_fields() {
        let f = parse_fields_from_text(SAMPLE);
        assert_eq!(f.date, "15-Mar-2024");
        assert_eq!(f.time, "10:30 AM");
        assert!(f.dial_in.starts_with("Dial-in: +91 22 6280 1144"));
        assert_eq!(
            f.registration_link,
            "https://services.diamondpass.net/register/12345"
        );
        assert!(f.host.starts_with("Globex Advisors"));
    }

    #[test]
    fn registration_link_falls_back_to_diamondpass_url() {
        let f = parse_fields_from_text(
            "Join via https://services.diamondpass.net/attend/99 at 11:00 AM",
        );
        assert_eq!(
            f.registration_link,
            "https://services.diamondpass.net/attend/99"
        );
    }

    #[test]
    fn long_month_date_lands_via_fallback() {
        let f = parse_fields_from_text("Date: March 15, 2024 Time: 4:00 PM");
        assert_eq!(f.date, "March 15, 2024");
        assert_eq!(f.time, "4:00 PM");
    }

    #[test]
    fn contacts_are_deduplicated() {
        let f = parse_fields_from_text(SAMPLE);
        let emails: Vec<_> = f
            .contacts
            .iter()
            .filter(|c| c.contains('@'))
            .collect();
        assert_eq!(emails, vec!["ir@acme.example"]);
        assert!(f.contacts.iter().any(|c| c.contains("98765")));
    }

    #[test]
    fn empty_text_returns_all_empty_fields() {
        let f = parse_fields_from_text("   \n \t ");
        assert_eq!(f, ExtractedFields::empty());
        assert!(f.contacts.is_empty());
    }

    #[test]
    fn unmatched_fields_stay_empty_strings() {
        let f = parse_fields_from_text("An announcement without any labels.");
        assert_eq!(f.date, "");
        assert_eq!(f.host, "");
        assert!(f.contacts.is_empty());
    }
}
