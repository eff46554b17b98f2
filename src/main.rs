//! Spark Curator — Binary Entrypoint
//! Boots the Axum HTTP server, wiring the ingestion pipeline, the spark
//! engine, and the analytics client behind the API routes.

use std::sync::Arc;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use spark_curator::api::{self, AppState};
use spark_curator::ingest::adapters::default_adapters;
use spark_curator::ingest::config::load_config_default;
use spark_curator::ingest::Ingestor;
use spark_curator::spark::{SparkEngine, SummarizeClient};
use spark_curator::store::MemoryStore;
use spark_curator::telemetry::Telemetry;
use spark_curator::{analytics::SearchMetricsClient, DynDocumentStore};

/// Collection holding curated resources. Per-user namespacing happens in
/// the backing store; the in-process default has a single user.
const RESOURCES_COLLECTION: &str = "resources";

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("spark_curator=info,warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op when absent. Supplies the adapter API
    // keys and collaborator endpoints.
    let _ = dotenvy::dotenv();
    init_tracing();

    let config = Arc::new(load_config_default()?);
    tracing::info!(
        subscriptions = config.subscriptions.len(),
        rules = config.rules.len(),
        "curator config loaded"
    );

    let telemetry = Telemetry::init(config.subscriptions.len());

    let store: DynDocumentStore = Arc::new(MemoryStore::new());
    let ingestor = Ingestor::new(default_adapters(), store.clone(), RESOURCES_COLLECTION);

    let summarize_client = SummarizeClient::from_env()
        .unwrap_or_else(|| SummarizeClient::new("http://localhost:9000/summarize"));
    let sparks = Arc::new(SparkEngine::new(summarize_client, store.clone()));
    let search = SearchMetricsClient::from_env().map(Arc::new);
    if search.is_none() {
        tracing::warn!("SEARCH_METRICS_URL not set; analytics routes disabled");
    }

    let state = AppState {
        ingestor,
        config,
        sparks,
        search,
        proxy_http: reqwest::Client::new(),
    };
    let router = api::create_router(state).merge(telemetry.router());

    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "spark-curator listening");
    axum::serve(listener, router).await?;
    Ok(())
}
