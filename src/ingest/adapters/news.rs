// src/ingest/adapters/news.rs
//! News-API adapter: one adapter, two upstream providers (NYT Article
//! Search and Guardian Content API), dispatched by which hostname substring
//! the subscribed URL matched.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metrics::{counter, histogram};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::time::Duration;

use crate::ingest::types::{Resource, ResourceStatus, SourceAdapter, FEED_PLUGIN_ID};

const NYT_HOST: &str = "nytimes.com";
const GUARDIAN_HOST: &str = "theguardian.com";

const DEFAULT_NYT_API: &str = "https://api.nytimes.com/svc/search/v2/articlesearch.json";
const DEFAULT_GUARDIAN_API: &str = "https://content.guardianapis.com/search";

// ---- NYT Article Search response shape ----

#[derive(Debug, Deserialize)]
struct NytEnvelope {
    response: NytResponse,
}
#[derive(Debug, Deserialize)]
struct NytResponse {
    #[serde(default)]
    docs: Vec<NytDoc>,
}
#[derive(Debug, Deserialize)]
struct NytDoc {
    #[serde(rename = "_id")]
    id: Option<String>,
    headline: NytHeadline,
    web_url: Option<String>,
    snippet: Option<String>,
    lead_paragraph: Option<String>,
    pub_date: Option<String>,
    section_name: Option<String>,
}
#[derive(Debug, Deserialize)]
struct NytHeadline {
    main: Option<String>,
}

// ---- Guardian Content API response shape ----

#[derive(Debug, Deserialize)]
struct GuardianEnvelope {
    response: GuardianResponse,
}
#[derive(Debug, Deserialize)]
struct GuardianResponse {
    #[serde(default)]
    results: Vec<GuardianDoc>,
}
#[derive(Debug, Deserialize)]
struct GuardianDoc {
    id: Option<String>,
    #[serde(rename = "webTitle")]
    web_title: Option<String>,
    #[serde(rename = "webUrl")]
    web_url: Option<String>,
    #[serde(rename = "sectionName")]
    section_name: Option<String>,
    #[serde(rename = "webPublicationDate")]
    web_publication_date: Option<String>,
    #[serde(default)]
    fields: Option<GuardianFields>,
}
#[derive(Debug, Deserialize)]
struct GuardianFields {
    #[serde(rename = "trailText")]
    trail_text: Option<String>,
}

/// Parse a provider timestamp; both RFC3339 ("...Z") and the NYT "+0000"
/// offset form are seen in the wild. Absent/unparsable dates fall back to
/// the ingest time.
fn parse_published_at(ts: Option<&str>, fallback: DateTime<Utc>) -> DateTime<Utc> {
    let Some(ts) = ts else { return fallback };
    DateTime::parse_from_rfc3339(ts)
        .or_else(|_| DateTime::parse_from_str(ts, "%Y-%m-%dT%H:%M:%S%z"))
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(fallback)
}

fn native_data(source: &str, section: Option<String>) -> Map<String, Value> {
    let mut m = Map::new();
    m.insert("source".to_string(), Value::String(source.to_string()));
    if let Some(section) = section {
        m.insert("section".to_string(), Value::String(section));
    }
    m
}

pub struct NewsAdapter {
    http: reqwest::Client,
    nyt_key: String,
    guardian_key: String,
    nyt_api: String,
    guardian_api: String,
}

impl NewsAdapter {
    /// Build from env: `NYT_API_KEY` / `GUARDIAN_API_KEY`. A missing key
    /// leaves that provider "unavailable" (empty results), not broken.
    pub fn from_env() -> Self {
        Self::new(
            std::env::var("NYT_API_KEY").unwrap_or_default(),
            std::env::var("GUARDIAN_API_KEY").unwrap_or_default(),
        )
    }

    pub fn new(nyt_key: String, guardian_key: String) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("spark-curator/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(10))
            .build()
            .expect("reqwest client");
        Self {
            http,
            nyt_key,
            guardian_key,
            nyt_api: DEFAULT_NYT_API.to_string(),
            guardian_api: DEFAULT_GUARDIAN_API.to_string(),
        }
    }

    /// Point the provider endpoints somewhere else (tests/local stubs).
    pub fn with_endpoints(mut self, nyt_api: &str, guardian_api: &str) -> Self {
        self.nyt_api = nyt_api.to_string();
        self.guardian_api = guardian_api.to_string();
        self
    }

    fn parse_nyt_body(body: &str) -> Result<Vec<Resource>> {
        let t0 = std::time::Instant::now();
        let envelope: NytEnvelope =
            serde_json::from_str(body).map_err(|e| anyhow::anyhow!("parsing NYT json: {e}"))?;
        let ingested_at = Utc::now();

        let out: Vec<Resource> = envelope
            .response
            .docs
            .into_iter()
            .map(|doc| Resource {
                plugin_id: FEED_PLUGIN_ID.to_string(),
                external_id: doc.id,
                title: doc.headline.main.unwrap_or_default(),
                url: doc.web_url,
                summary: doc
                    .snippet
                    .filter(|s| !s.is_empty())
                    .or(doc.lead_paragraph)
                    .unwrap_or_default(),
                published_at: parse_published_at(doc.pub_date.as_deref(), ingested_at),
                ingested_at,
                status: ResourceStatus::New,
                tags: None,
                native_data: native_data("NYT", doc.section_name),
            })
            .collect();

        histogram!("ingest_parse_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        counter!("ingest_items_total").increment(out.len() as u64);
        Ok(out)
    }

    fn parse_guardian_body(body: &str) -> Result<Vec<Resource>> {
        let t0 = std::time::Instant::now();
        let envelope: GuardianEnvelope = serde_json::from_str(body)
            .map_err(|e| anyhow::anyhow!("parsing Guardian json: {e}"))?;
        let ingested_at = Utc::now();

        let out: Vec<Resource> = envelope
            .response
            .results
            .into_iter()
            .map(|doc| Resource {
                plugin_id: FEED_PLUGIN_ID.to_string(),
                external_id: doc.id,
                title: doc.web_title.unwrap_or_default(),
                url: doc.web_url,
                summary: doc
                    .fields
                    .and_then(|f| f.trail_text)
                    .unwrap_or_default(),
                published_at: parse_published_at(
                    doc.web_publication_date.as_deref(),
                    ingested_at,
                ),
                ingested_at,
                status: ResourceStatus::New,
                tags: None,
                native_data: native_data("Guardian", doc.section_name),
            })
            .collect();

        histogram!("ingest_parse_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        counter!("ingest_items_total").increment(out.len() as u64);
        Ok(out)
    }

    async fn fetch_nyt(&self) -> Vec<Resource> {
        if self.nyt_key.is_empty() {
            tracing::warn!(provider = "NYT", "missing API key; source unavailable");
            return Vec::new();
        }
        let url = format!("{}?q=environment&api-key={}", self.nyt_api, self.nyt_key);
        match self.get_body(&url, "NYT").await {
            Some(body) => Self::parse_nyt_body(&body).unwrap_or_else(|e| {
                tracing::warn!(error = ?e, provider = "NYT", "malformed payload");
                counter!("ingest_adapter_errors_total").increment(1);
                Vec::new()
            }),
            None => Vec::new(),
        }
    }

    async fn fetch_guardian(&self) -> Vec<Resource> {
        if self.guardian_key.is_empty() {
            tracing::warn!(provider = "Guardian", "missing API key; source unavailable");
            return Vec::new();
        }
        let url = format!(
            "{}?q=environment&api-key={}&show-fields=trailText,thumbnail",
            self.guardian_api, self.guardian_key
        );
        match self.get_body(&url, "Guardian").await {
            Some(body) => Self::parse_guardian_body(&body).unwrap_or_else(|e| {
                tracing::warn!(error = ?e, provider = "Guardian", "malformed payload");
                counter!("ingest_adapter_errors_total").increment(1);
                Vec::new()
            }),
            None => Vec::new(),
        }
    }

    async fn get_body(&self, url: &str, provider: &'static str) -> Option<String> {
        match self.http.get(url).send().await {
            Ok(resp) => match resp.text().await {
                Ok(body) => Some(body),
                Err(e) => {
                    tracing::warn!(error = ?e, provider, "provider body read error");
                    counter!("ingest_adapter_errors_total").increment(1);
                    None
                }
            },
            Err(e) => {
                tracing::warn!(error = ?e, provider, "provider http error");
                counter!("ingest_adapter_errors_total").increment(1);
                None
            }
        }
    }
}

#[async_trait]
impl SourceAdapter for NewsAdapter {
    fn validates(&self, url: &str) -> bool {
        url.contains(NYT_HOST) || url.contains(GUARDIAN_HOST)
    }

    async fn fetch(&self, url: &str) -> Result<Vec<Resource>> {
        // Strategy switch: re-check which hostname substring matched.
        if url.contains(NYT_HOST) {
            return Ok(self.fetch_nyt().await);
        }
        if url.contains(GUARDIAN_HOST) {
            return Ok(self.fetch_guardian().await);
        }
        Ok(Vec::new())
    }

    fn name(&self) -> &'static str {
        "news"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NYT_FIXTURE: &str = r#"{
      "response": { "docs": [
        {
          "_id": "nyt://article/abc",
          "headline": { "main": "Forests under pressure" },
          "web_url": "https://www.nytimes.com/2024/01/02/climate/forests.html",
          "snippet": "Old growth keeps shrinking.",
          "lead_paragraph": "Longer text here.",
          "pub_date": "2024-01-02T09:30:00+0000",
          "section_name": "Climate"
        },
        {
          "_id": "nyt://article/def",
          "headline": { "main": "No snippet piece" },
          "web_url": "https://www.nytimes.com/2024/01/03/climate/rivers.html",
          "snippet": "",
          "lead_paragraph": "Falls back to the lead paragraph.",
          "pub_date": null,
          "section_name": null
        }
      ]}
    }"#;

    const GUARDIAN_FIXTURE: &str = r#"{
      "response": { "results": [
        {
          "id": "environment/2024/jan/02/peat",
          "webTitle": "Peatland restoration accelerates",
          "webUrl": "https://www.theguardian.com/environment/2024/jan/02/peat",
          "sectionName": "Environment",
          "webPublicationDate": "2024-01-02T10:00:00Z",
          "fields": { "trailText": "Bogs are back." }
        }
      ]}
    }"#;

    #[test]
    fn nyt_docs_normalize_to_resources() {
        let out = NewsAdapter::parse_nyt_body(NYT_FIXTURE).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].title, "Forests under pressure");
        assert_eq!(out[0].summary, "Old growth keeps shrinking.");
        assert_eq!(
            out[0].url.as_deref(),
            Some("https://www.nytimes.com/2024/01/02/climate/forests.html")
        );
        assert_eq!(out[0].status, ResourceStatus::New);
        assert!(out[0].tags.is_none());
        assert_eq!(out[0].native_data["source"], "NYT");
        assert_eq!(out[0].native_data["section"], "Climate");
        assert_eq!(
            out[0].published_at.to_rfc3339(),
            "2024-01-02T09:30:00+00:00"
        );
        // Empty snippet falls back to lead paragraph.
        assert_eq!(out[1].summary, "Falls back to the lead paragraph.");
    }

    #[test]
    fn guardian_results_normalize_to_resources() {
        let out = NewsAdapter::parse_guardian_body(GUARDIAN_FIXTURE).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].title, "Peatland restoration accelerates");
        assert_eq!(out[0].summary, "Bogs are back.");
        assert_eq!(out[0].external_id.as_deref(), Some("environment/2024/jan/02/peat"));
        assert_eq!(out[0].native_data["source"], "Guardian");
    }

    #[test]
    fn malformed_payload_is_an_error_not_a_panic() {
        assert!(NewsAdapter::parse_nyt_body("{ not json").is_err());
        assert!(NewsAdapter::parse_guardian_body(r#"{"response":{}}"#).is_ok());
    }

    #[test]
    fn validates_recognizes_both_hosts_only() {
        let adapter = NewsAdapter::new(String::new(), String::new());
        assert!(adapter.validates("https://www.nytimes.com/section/climate"));
        assert!(adapter.validates("https://www.theguardian.com/environment"));
        assert!(!adapter.validates("https://example.com/blog"));
    }

    #[tokio::test]
    async fn missing_keys_mean_source_unavailable_not_error() {
        let adapter = NewsAdapter::new(String::new(), String::new());
        let out = adapter
            .fetch("https://www.nytimes.com/section/climate")
            .await
            .unwrap();
        assert!(out.is_empty());
    }
}
