// src/ingest/types.rs
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Plugin identifier stamped on every resource produced by the feed adapters.
pub const FEED_PLUGIN_ID: &str = "feed-aggregator";

/// Workflow state of a curated resource. Adapters always start items at `New`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ResourceStatus {
    #[default]
    New,
    ToAnalyze,
    ToWrite,
    ToShare,
    Reference,
}

/// Canonical normalized representation of one ingested external item.
///
/// Adapters construct these fresh on every fetch; identity is computed
/// downstream from `url` and never stored here. After classification the
/// object is not mutated further.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Resource {
    /// Producing source's identifier, constant per adapter.
    pub plugin_id: String,
    /// Source-native id, if the source provides one. Informational only;
    /// deduplication is by URL-derived identity, never by this.
    #[serde(default)]
    pub external_id: Option<String>,
    pub title: String,
    /// Canonical external URL. Items without one are dropped before
    /// persistence.
    pub url: Option<String>,
    pub summary: String,
    /// Source-asserted publish time.
    pub published_at: DateTime<Utc>,
    /// When this pipeline observed the item (set at fetch time).
    pub ingested_at: DateTime<Utc>,
    pub status: ResourceStatus,
    /// Topical labels set by the classifier. `None` means "not yet
    /// classified", which is distinct from "classified as nothing".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    /// Source-specific metadata (originating section etc.), opaque here.
    #[serde(default)]
    pub native_data: Map<String, Value>,
}

/// One user-subscribed source URL.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeedSubscription {
    pub url: String,
    /// User-defined alias.
    #[serde(default)]
    pub name: Option<String>,
    /// Hide/skip without deleting.
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

/// Source-specific strategy: URL recognition plus fetch/normalize.
///
/// Adding a source means appending an implementation to the registry,
/// never modifying existing adapters. A failing provider call resolves to
/// an empty list (logged), so one source can never abort ingestion for the
/// others.
#[async_trait::async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Does this URL belong to this adapter's source?
    fn validates(&self, url: &str) -> bool;
    /// Fetch and normalize the source's current items.
    async fn fetch(&self, url: &str) -> Result<Vec<Resource>>;
    fn name(&self) -> &'static str;
}
