// src/store.rs
//! Storage collaborator seam.
//!
//! The pipeline only needs upsert-by-id and equality-filtered listing from
//! whatever document store backs it (per-user namespacing is encoded in the
//! collection path). `MemoryStore` is the in-process implementation used by
//! the binary default and by tests; a real backend implements the same
//! trait.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use anyhow::Result;
use serde_json::Value;
use tokio::sync::{broadcast, RwLock};

/// Convenient alias used by callers.
pub type DynDocumentStore = Arc<dyn DocumentStore>;

/// Minimal document-store capability: create-or-replace by id, get by id,
/// and listing with an optional top-level field equality filter.
#[async_trait::async_trait]
pub trait DocumentStore: Send + Sync {
    async fn upsert(&self, collection: &str, id: &str, doc: Value) -> Result<()>;
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>>;
    async fn list(&self, collection: &str, filter: Option<(&str, &Value)>) -> Result<Vec<Value>>;
}

/// Change notification emitted by [`MemoryStore::watch`].
#[derive(Debug, Clone)]
pub struct DocChange {
    pub collection: String,
    pub id: String,
    pub doc: Value,
}

/// Cancellable subscription to a collection's changes.
///
/// Dropping the handle (or calling [`WatchHandle::cancel`]) detaches the
/// receiver; in-flight notifications are simply discarded. The core
/// pipeline never depends on this, it exists for the store/UI layer.
pub struct WatchHandle {
    rx: Option<broadcast::Receiver<DocChange>>,
}

impl WatchHandle {
    /// Wait for the next change in the watched collection.
    pub async fn next(&mut self) -> Option<DocChange> {
        let rx = self.rx.as_mut()?;
        loop {
            match rx.recv().await {
                Ok(change) => return Some(change),
                // Lagged receivers skip ahead; closed senders end the stream.
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    pub fn cancel(&mut self) {
        self.rx = None;
    }
}

/// In-memory document store keyed `collection -> id -> document`.
pub struct MemoryStore {
    collections: RwLock<HashMap<String, BTreeMap<String, Value>>>,
    changes: broadcast::Sender<DocChange>,
}

impl MemoryStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(64);
        Self {
            collections: RwLock::new(HashMap::new()),
            changes,
        }
    }

    /// Subscribe to upserts on one collection.
    pub fn watch(&self, collection: &str) -> WatchHandle {
        // Filtering happens receiver-side in `next`; a single channel keeps
        // the store simple.
        let _ = collection;
        WatchHandle {
            rx: Some(self.changes.subscribe()),
        }
    }

    /// Number of documents in a collection (diagnostics/telemetry).
    pub async fn count(&self, collection: &str) -> usize {
        self.collections
            .read()
            .await
            .get(collection)
            .map(|c| c.len())
            .unwrap_or(0)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl DocumentStore for MemoryStore {
    async fn upsert(&self, collection: &str, id: &str, doc: Value) -> Result<()> {
        let mut cols = self.collections.write().await;
        cols.entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), doc.clone());
        // No subscribers is fine.
        let _ = self.changes.send(DocChange {
            collection: collection.to_string(),
            id: id.to_string(),
            doc,
        });
        Ok(())
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>> {
        let cols = self.collections.read().await;
        Ok(cols.get(collection).and_then(|c| c.get(id)).cloned())
    }

    async fn list(&self, collection: &str, filter: Option<(&str, &Value)>) -> Result<Vec<Value>> {
        let cols = self.collections.read().await;
        let Some(col) = cols.get(collection) else {
            return Ok(Vec::new());
        };
        let out = col
            .values()
            .filter(|doc| match filter {
                Some((field, expected)) => doc.get(field) == Some(expected),
                None => true,
            })
            .cloned()
            .collect();
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn upsert_replaces_by_id() {
        let store = MemoryStore::new();
        store
            .upsert("resources", "doc_1", json!({"title": "first"}))
            .await
            .unwrap();
        store
            .upsert("resources", "doc_1", json!({"title": "second"}))
            .await
            .unwrap();

        let docs = store.list("resources", None).await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0]["title"], "second");
        assert_eq!(
            store.get("resources", "doc_1").await.unwrap().unwrap()["title"],
            "second"
        );
    }

    #[tokio::test]
    async fn list_applies_equality_filter() {
        let store = MemoryStore::new();
        store
            .upsert("resources", "a", json!({"plugin_id": "feed-aggregator"}))
            .await
            .unwrap();
        store
            .upsert("resources", "b", json!({"plugin_id": "notes"}))
            .await
            .unwrap();

        let expected = json!("feed-aggregator");
        let docs = store
            .list("resources", Some(("plugin_id", &expected)))
            .await
            .unwrap();
        assert_eq!(docs.len(), 1);
    }

    #[tokio::test]
    async fn watch_sees_upserts_until_cancelled() {
        let store = MemoryStore::new();
        let mut watch = store.watch("resources");

        store
            .upsert("resources", "doc_9", json!({"title": "t"}))
            .await
            .unwrap();
        let change = watch.next().await.expect("one change");
        assert_eq!(change.id, "doc_9");

        watch.cancel();
        assert!(watch.next().await.is_none());
    }
}
