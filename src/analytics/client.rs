// src/analytics/client.rs
//! Client for the search-metrics collaborator: `mode=sites` lists site
//! identifiers the credentials can read, `mode=query` / `mode=overview`
//! return raw rows for a trailing 30-day window.

use std::time::Duration;

use anyhow::{Context, Result};

use crate::analytics::SearchRow;

/// Rows kept for the query dimension (top keywords).
const QUERY_ROW_LIMIT: usize = 10;
/// Rows kept for the date dimension (one per day, inclusive range).
const OVERVIEW_ROW_LIMIT: usize = 31;

pub struct SearchMetricsClient {
    http: reqwest::Client,
    base_url: String,
}

impl SearchMetricsClient {
    /// `base_url` is the collaborator endpoint taking `mode` and `siteUrl`
    /// query parameters.
    pub fn new(base_url: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("spark-curator/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(15))
            .build()
            .expect("reqwest client");
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    pub fn from_env() -> Option<Self> {
        std::env::var("SEARCH_METRICS_URL")
            .ok()
            .filter(|s| !s.is_empty())
            .map(Self::new)
    }

    /// Sites the collaborator credentials can access, sorted.
    pub async fn sites(&self) -> Result<Vec<String>> {
        let mut sites: Vec<String> = self
            .http
            .get(&self.base_url)
            .query(&[("mode", "sites")])
            .send()
            .await
            .context("sites request")?
            .error_for_status()
            .context("sites response status")?
            .json()
            .await
            .context("parsing sites response")?;
        sites.sort();
        Ok(sites)
    }

    /// Fetch both row sets for the window in parallel:
    /// query-dimensioned top keywords and date-dimensioned daily history.
    /// The trailing 30-day range ending now is fixed by the collaborator
    /// per request. Overview rows are re-sorted ascending by date key since
    /// the upstream source does not guarantee order.
    pub async fn fetch_window(&self, site_url: &str) -> Result<(Vec<SearchRow>, Vec<SearchRow>)> {
        let (queries, overview) = tokio::join!(
            self.rows(site_url, "query"),
            self.rows(site_url, "overview"),
        );
        let mut queries = queries?;
        queries.truncate(QUERY_ROW_LIMIT);
        let mut overview = overview?;
        overview.sort_by(|a, b| a.keys.first().cmp(&b.keys.first()));
        overview.truncate(OVERVIEW_ROW_LIMIT);
        Ok((queries, overview))
    }

    async fn rows(&self, site_url: &str, mode: &str) -> Result<Vec<SearchRow>> {
        let rows: Vec<SearchRow> = self
            .http
            .get(&self.base_url)
            .query(&[("mode", mode), ("siteUrl", site_url)])
            .send()
            .await
            .with_context(|| format!("{mode} request"))?
            .error_for_status()
            .with_context(|| format!("{mode} response status"))?
            .json()
            .await
            .with_context(|| format!("parsing {mode} rows"))?;
        Ok(rows)
    }
}
