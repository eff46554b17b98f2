// src/ingest/mod.rs
pub mod adapters;
pub mod classify;
pub mod config;
pub mod types;

use std::sync::Arc;

use anyhow::{Context, Result};
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge};
use once_cell::sync::OnceCell;
use serde::Serialize;
use tokio::task::JoinSet;

use crate::identity::document_id;
use crate::ingest::classify::{apply_buckets, BucketRule};
use crate::ingest::types::{FeedSubscription, Resource, SourceAdapter};
use crate::store::DynDocumentStore;

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("ingest_items_total", "Items parsed from source adapters.");
        describe_counter!(
            "ingest_kept_total",
            "Items upserted after classification + URL filtering."
        );
        describe_counter!(
            "ingest_dropped_total",
            "Items dropped for lacking a resolvable URL."
        );
        describe_counter!(
            "ingest_adapter_errors_total",
            "Adapter fetch/parse errors (resolved to empty batches)."
        );
        describe_histogram!("ingest_parse_ms", "Adapter parse time in milliseconds.");
        describe_gauge!(
            "ingest_last_run_ts",
            "Unix ts when the ingest pipeline last ran."
        );
    });
}

/// Outcome of one ingestion run (one subscription or a whole batch).
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct IngestReport {
    /// Items the adapter produced.
    pub fetched: usize,
    /// Items upserted into the store.
    pub kept: usize,
    /// Items dropped for lacking a URL.
    pub dropped: usize,
    /// Subscriptions that failed at the persistence stage.
    pub errors: usize,
}

impl IngestReport {
    fn merge(&mut self, other: IngestReport) {
        self.fetched += other.fetched;
        self.kept += other.kept;
        self.dropped += other.dropped;
        self.errors += other.errors;
    }
}

/// Ingestion coordinator: routes a subscribed URL to the adapter claiming
/// it, classifies the fetched items, and upserts them keyed by URL-derived
/// identity so re-ingestion updates instead of duplicating.
#[derive(Clone)]
pub struct Ingestor {
    adapters: Arc<Vec<Arc<dyn SourceAdapter>>>,
    store: DynDocumentStore,
    collection: String,
}

impl Ingestor {
    pub fn new(
        adapters: Vec<Arc<dyn SourceAdapter>>,
        store: DynDocumentStore,
        collection: impl Into<String>,
    ) -> Self {
        Self {
            adapters: Arc::new(adapters),
            store,
            collection: collection.into(),
        }
    }

    /// Ingest one subscribed URL.
    ///
    /// No adapter claiming the URL is a no-op, not an error: subscription
    /// lists are user-edited and may point at unsupported sources. Adapter
    /// failures resolve to an empty batch. Persistence failures propagate
    /// unchanged; there is no retry here.
    pub async fn ingest_subscription(
        &self,
        url: &str,
        rules: &[BucketRule],
    ) -> Result<IngestReport> {
        ensure_metrics_described();

        let Some(adapter) = adapters::adapter_for(&self.adapters, url) else {
            tracing::debug!(url, "no adapter claims this url; skipping");
            return Ok(IngestReport::default());
        };

        let fetched = match adapter.fetch(url).await {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!(error = ?e, adapter = adapter.name(), url, "adapter error");
                counter!("ingest_adapter_errors_total").increment(1);
                Vec::new()
            }
        };
        let fetched_count = fetched.len();

        // Classification happens strictly after the fetch completes and
        // before any persistence for this batch.
        let classified = apply_buckets(fetched, rules);

        let mut report = IngestReport {
            fetched: fetched_count,
            ..Default::default()
        };
        for resource in classified {
            // Empty URLs count as unresolvable, same as absent ones.
            let Some(url) = resource.url.as_deref().filter(|u| !u.is_empty()) else {
                report.dropped += 1;
                continue;
            };
            let id = document_id(Some(url));
            let doc = serde_json::to_value(&resource).context("serializing resource")?;
            self.store
                .upsert(&self.collection, &id, doc)
                .await
                .with_context(|| format!("upserting {id}"))?;
            report.kept += 1;
        }

        counter!("ingest_kept_total").increment(report.kept as u64);
        counter!("ingest_dropped_total").increment(report.dropped as u64);
        gauge!("ingest_last_run_ts").set(chrono::Utc::now().timestamp().max(0) as f64);

        Ok(report)
    }

    /// Ingest every active subscription concurrently.
    ///
    /// Failures stay isolated per subscription: one broken source never
    /// hides successfully ingested items from the others. Writes are
    /// idempotent upserts keyed by identity, so interleaving is safe.
    pub async fn ingest_all(
        &self,
        subscriptions: &[FeedSubscription],
        rules: &[BucketRule],
    ) -> IngestReport {
        let mut tasks = JoinSet::new();
        for sub in subscriptions.iter().filter(|s| s.active) {
            let ingestor = self.clone();
            let url = sub.url.clone();
            let rules = rules.to_vec();
            tasks.spawn(async move { ingestor.ingest_subscription(&url, &rules).await });
        }

        let mut report = IngestReport::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(sub_report)) => report.merge(sub_report),
                Ok(Err(e)) => {
                    tracing::warn!(error = ?e, "subscription ingest failed");
                    report.errors += 1;
                }
                Err(e) => {
                    tracing::warn!(error = ?e, "subscription ingest task panicked");
                    report.errors += 1;
                }
            }
        }
        report
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn store(&self) -> &DynDocumentStore {
        &self.store
    }
}

/// Classify then key resources by identity without persisting.
/// Exposed for callers that bring their own storage transaction.
pub fn classify_and_key(
    resources: Vec<Resource>,
    rules: &[BucketRule],
) -> (Vec<(String, Resource)>, usize) {
    let mut dropped = 0usize;
    let mut keyed = Vec::new();
    for resource in apply_buckets(resources, rules) {
        match resource.url.as_deref().filter(|u| !u.is_empty()) {
            Some(url) => keyed.push((document_id(Some(url)), resource)),
            None => dropped += 1,
        }
    }
    (keyed, dropped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::types::{ResourceStatus, FEED_PLUGIN_ID};
    use chrono::Utc;

    fn resource(url: Option<&str>, title: &str) -> Resource {
        Resource {
            plugin_id: FEED_PLUGIN_ID.to_string(),
            external_id: None,
            title: title.to_string(),
            url: url.map(|u| u.to_string()),
            summary: String::new(),
            published_at: Utc::now(),
            ingested_at: Utc::now(),
            status: ResourceStatus::New,
            tags: None,
            native_data: serde_json::Map::new(),
        }
    }

    #[test]
    fn classify_and_key_drops_urlless_items() {
        let (keyed, dropped) = classify_and_key(
            vec![
                resource(Some("https://a.com/x"), "kept"),
                resource(None, "dropped"),
                resource(Some(""), "also dropped"),
            ],
            &[],
        );
        assert_eq!(keyed.len(), 1);
        assert_eq!(dropped, 2);
        assert!(keyed[0].0.starts_with("doc_"));
        assert_eq!(keyed[0].1.title, "kept");
    }

    #[test]
    fn identical_urls_key_identically() {
        let (a, _) = classify_and_key(vec![resource(Some("https://a.com/x"), "one")], &[]);
        let (b, _) = classify_and_key(vec![resource(Some("https://a.com/x"), "two")], &[]);
        assert_eq!(a[0].0, b[0].0);
    }
}
