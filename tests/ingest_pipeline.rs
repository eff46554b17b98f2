// tests/ingest_pipeline.rs
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;

use spark_curator::ingest::Ingestor;
use spark_curator::store::DocumentStore;
use spark_curator::{BucketRule, MemoryStore, Resource, ResourceStatus, SourceAdapter};

struct MockWireAdapter;

fn item(url: Option<&str>, title: &str, summary: &str) -> Resource {
    Resource {
        plugin_id: "feed-aggregator".to_string(),
        external_id: None,
        title: title.to_string(),
        url: url.map(|u| u.to_string()),
        summary: summary.to_string(),
        published_at: Utc::now(),
        ingested_at: Utc::now(),
        status: ResourceStatus::New,
        tags: None,
        native_data: serde_json::Map::new(),
    }
}

#[async_trait]
impl SourceAdapter for MockWireAdapter {
    fn validates(&self, url: &str) -> bool {
        url.contains("mockwire.test")
    }
    async fn fetch(&self, _url: &str) -> Result<Vec<Resource>> {
        Ok(vec![
            item(
                Some("https://mockwire.test/rivers"),
                "River levels rising",
                "The river burst its banks.",
            ),
            item(
                Some("https://mockwire.test/forests"),
                "Tree cover report",
                "Canopy loss slows.",
            ),
            item(None, "No link item", "Dropped before persistence."),
            item(Some(""), "Empty link item", "Also unresolvable."),
        ])
    }
    fn name(&self) -> &'static str {
        "mockwire"
    }
}

fn test_ingestor(store: Arc<MemoryStore>) -> Ingestor {
    Ingestor::new(vec![Arc::new(MockWireAdapter)], store, "resources")
}

#[tokio::test]
async fn ingest_classifies_keys_and_drops_urlless_items() {
    let store = Arc::new(MemoryStore::new());
    let ingestor = test_ingestor(store.clone());
    let rules = vec![
        BucketRule {
            name: "Water".to_string(),
            keywords: vec!["river".to_string()],
        },
        BucketRule {
            name: "Forests".to_string(),
            keywords: vec!["tree".to_string(), "canopy".to_string()],
        },
    ];

    let report = ingestor
        .ingest_subscription("https://mockwire.test/feed", &rules)
        .await
        .unwrap();
    assert_eq!(report.fetched, 4);
    assert_eq!(report.kept, 2);
    // Both the absent-link and the empty-link items are unresolvable.
    assert_eq!(report.dropped, 2);

    let docs = store.list("resources", None).await.unwrap();
    assert_eq!(docs.len(), 2);
    let tagged: Vec<_> = docs
        .iter()
        .map(|d| (d["title"].as_str().unwrap().to_string(), d["tags"].clone()))
        .collect();
    assert!(tagged.iter().any(|(t, tags)| t == "River levels rising"
        && tags == &serde_json::json!(["Water"])));
    assert!(tagged.iter().any(|(t, tags)| t == "Tree cover report"
        && tags == &serde_json::json!(["Forests"])));
}

#[tokio::test]
async fn reingesting_the_same_feed_is_idempotent() {
    let store = Arc::new(MemoryStore::new());
    let ingestor = test_ingestor(store.clone());

    for _ in 0..2 {
        let report = ingestor
            .ingest_subscription("https://mockwire.test/feed", &[])
            .await
            .unwrap();
        assert_eq!(report.kept, 2);
    }

    // Same upstream response twice: still exactly one document per
    // distinct item, keyed by recomputed identity.
    let docs = store.list("resources", None).await.unwrap();
    assert_eq!(docs.len(), 2);
}

#[tokio::test]
async fn unsupported_url_is_a_quiet_no_op() {
    let store = Arc::new(MemoryStore::new());
    let ingestor = test_ingestor(store.clone());

    let report = ingestor
        .ingest_subscription("https://unsupported.example/whatever", &[])
        .await
        .unwrap();
    assert_eq!(report, Default::default());
    assert!(store.list("resources", None).await.unwrap().is_empty());
}
