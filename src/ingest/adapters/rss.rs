// src/ingest/adapters/rss.rs
//! Generic RSS adapter for plain feed URLs the news APIs don't cover.
//!
//! Feeds can be fetched directly or through the feed-fetch proxy
//! collaborator (`FEED_PROXY_URL`), which returns the upstream body
//! verbatim; the proxy exists to sidestep cross-origin limits for browser
//! deployments, server-side it is optional.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use metrics::{counter, histogram};
use quick_xml::de::from_str;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::time::Duration;
use time::{format_description::well_known::Rfc2822, OffsetDateTime, UtcOffset};

use crate::ingest::types::{Resource, ResourceStatus, SourceAdapter, FEED_PLUGIN_ID};

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

fn parse_rfc2822_utc(ts: &str) -> Option<DateTime<Utc>> {
    let unix = OffsetDateTime::parse(ts, &Rfc2822)
        .ok()?
        .to_offset(UtcOffset::UTC)
        .unix_timestamp();
    Utc.timestamp_opt(unix, 0).single()
}

/// Some feeds embed HTML entities quick-xml chokes on; scrub the common
/// ones before deserializing.
fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
}

pub struct RssAdapter {
    http: reqwest::Client,
    proxy_url: Option<String>,
}

impl RssAdapter {
    pub fn from_env() -> Self {
        Self::new(std::env::var("FEED_PROXY_URL").ok().filter(|s| !s.is_empty()))
    }

    pub fn new(proxy_url: Option<String>) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("spark-curator/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(10))
            .build()
            .expect("reqwest client");
        Self { http, proxy_url }
    }

    fn parse_items_from_str(s: &str) -> Result<Vec<Resource>> {
        let t0 = std::time::Instant::now();
        let xml_clean = scrub_html_entities_for_xml(s);
        let rss: Rss = from_str(&xml_clean).context("parsing rss xml")?;
        let ingested_at = Utc::now();

        let mut out = Vec::with_capacity(rss.channel.item.len());
        for it in rss.channel.item {
            let title = html_escape::decode_html_entities(
                it.title.as_deref().unwrap_or_default(),
            )
            .trim()
            .to_string();
            let summary = html_escape::decode_html_entities(
                it.description.as_deref().unwrap_or_default(),
            )
            .trim()
            .to_string();
            if title.is_empty() && summary.is_empty() {
                continue;
            }

            let mut native = Map::new();
            native.insert("source".to_string(), Value::String("RSS".to_string()));

            out.push(Resource {
                plugin_id: FEED_PLUGIN_ID.to_string(),
                // RSS guids are unreliable across feeds; identity comes from
                // the link anyway.
                external_id: None,
                title,
                url: it.link,
                summary,
                published_at: it
                    .pub_date
                    .as_deref()
                    .and_then(parse_rfc2822_utc)
                    .unwrap_or(ingested_at),
                ingested_at,
                status: ResourceStatus::New,
                tags: None,
                native_data: native,
            });
        }

        histogram!("ingest_parse_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        counter!("ingest_items_total").increment(out.len() as u64);
        Ok(out)
    }

    async fn get_feed_body(&self, feed_url: &str) -> Option<String> {
        let req = match &self.proxy_url {
            Some(proxy) => self.http.get(proxy).query(&[("url", feed_url)]),
            None => self.http.get(feed_url),
        };
        match req.send().await {
            Ok(resp) if resp.status().is_success() => resp.text().await.ok(),
            Ok(resp) => {
                tracing::warn!(status = %resp.status(), url = feed_url, "feed fetch failed");
                counter!("ingest_adapter_errors_total").increment(1);
                None
            }
            Err(e) => {
                tracing::warn!(error = ?e, url = feed_url, "feed http error");
                counter!("ingest_adapter_errors_total").increment(1);
                None
            }
        }
    }
}

#[async_trait]
impl SourceAdapter for RssAdapter {
    fn validates(&self, url: &str) -> bool {
        let u = url.to_lowercase();
        u.contains("rss") || u.contains("/feed") || u.contains("atom") || u.ends_with(".xml")
    }

    async fn fetch(&self, url: &str) -> Result<Vec<Resource>> {
        let Some(body) = self.get_feed_body(url).await else {
            return Ok(Vec::new());
        };
        Ok(Self::parse_items_from_str(&body).unwrap_or_else(|e| {
            tracing::warn!(error = ?e, url, "malformed feed payload");
            counter!("ingest_adapter_errors_total").increment(1);
            Vec::new()
        }))
    }

    fn name(&self) -> &'static str {
        "rss"
    }
}
