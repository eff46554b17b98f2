// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod analytics;
pub mod api;
pub mod identity;
pub mod ingest;
pub mod spark;
pub mod store;
pub mod telemetry;

// ---- Re-exports for stable public API ----
pub use crate::analytics::{summarize, MetricsSummary, SearchRow};
pub use crate::identity::document_id;
pub use crate::ingest::classify::{apply_buckets, BucketRule};
pub use crate::ingest::types::{FeedSubscription, Resource, ResourceStatus, SourceAdapter};
pub use crate::ingest::{IngestReport, Ingestor};
pub use crate::store::{DocumentStore, DynDocumentStore, MemoryStore};
