// src/api.rs
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;

use crate::analytics::{summarize, SearchMetricsClient};
use crate::ingest::config::CuratorConfig;
use crate::ingest::{IngestReport, Ingestor};
use crate::spark::SparkEngine;

#[derive(Clone)]
pub struct AppState {
    pub ingestor: Ingestor,
    pub config: Arc<CuratorConfig>,
    pub sparks: Arc<SparkEngine>,
    pub search: Option<Arc<SearchMetricsClient>>,
    pub proxy_http: reqwest::Client,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/ingest", post(run_ingest))
        .route("/resources", get(list_resources))
        .route("/analyze", post(analyze))
        .route("/sparks", get(find_spark))
        .route("/analytics/sites", get(analytics_sites))
        .route("/analytics/overview", get(analytics_overview))
        .route("/feed", get(feed_proxy))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

type ApiError = (StatusCode, String);

fn bad_gateway(e: anyhow::Error) -> ApiError {
    (StatusCode::BAD_GATEWAY, format!("{e:#}"))
}

/// Run ingestion for every active configured subscription.
async fn run_ingest(State(state): State<AppState>) -> Json<IngestReport> {
    let report = state
        .ingestor
        .ingest_all(&state.config.subscriptions, &state.config.rules)
        .await;
    tracing::info!(
        fetched = report.fetched,
        kept = report.kept,
        dropped = report.dropped,
        errors = report.errors,
        "ingest run finished"
    );
    Json(report)
}

async fn list_resources(State(state): State<AppState>) -> Result<Json<Vec<Value>>, ApiError> {
    let docs = state
        .ingestor
        .store()
        .list(state.ingestor.collection(), None)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("{e:#}")))?;
    Ok(Json(docs))
}

#[derive(Deserialize)]
struct AnalyzeReq {
    title: String,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    url: Option<String>,
}

async fn analyze(
    State(state): State<AppState>,
    Json(body): Json<AnalyzeReq>,
) -> Result<Json<Value>, ApiError> {
    let analysis = state
        .sparks
        .analyze(&body.title, &body.summary, body.url.as_deref())
        .await
        .map_err(bad_gateway)?;
    match analysis {
        Some(a) => Ok(Json(serde_json::to_value(a).unwrap_or(Value::Null))),
        None => Err((StatusCode::BAD_REQUEST, "resource has no url".to_string())),
    }
}

#[derive(Deserialize)]
struct UrlQuery {
    url: Option<String>,
}

async fn find_spark(
    State(state): State<AppState>,
    Query(q): Query<UrlQuery>,
) -> Result<Json<Option<Value>>, ApiError> {
    let Some(url) = q.url else {
        return Err((StatusCode::BAD_REQUEST, "missing url parameter".to_string()));
    };
    let spark = state
        .sparks
        .find_spark(&url)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("{e:#}")))?;
    Ok(Json(spark))
}

fn search_client(state: &AppState) -> Result<&Arc<SearchMetricsClient>, ApiError> {
    state.search.as_ref().ok_or((
        StatusCode::SERVICE_UNAVAILABLE,
        "search metrics collaborator not configured".to_string(),
    ))
}

async fn analytics_sites(State(state): State<AppState>) -> Result<Json<Vec<String>>, ApiError> {
    let sites = search_client(&state)?.sites().await.map_err(bad_gateway)?;
    Ok(Json(sites))
}

#[derive(Deserialize)]
struct OverviewQuery {
    #[serde(rename = "siteUrl")]
    site_url: Option<String>,
}

async fn analytics_overview(
    State(state): State<AppState>,
    Query(q): Query<OverviewQuery>,
) -> Result<Json<Value>, ApiError> {
    let Some(site_url) = q.site_url else {
        return Err((
            StatusCode::BAD_REQUEST,
            "missing siteUrl parameter".to_string(),
        ));
    };
    let (queries, history) = search_client(&state)?
        .fetch_window(&site_url)
        .await
        .map_err(bad_gateway)?;
    let totals = summarize(&history);
    Ok(Json(json!({
        "queries": queries,
        "history": history,
        "totals": totals,
    })))
}

/// Generic feed-fetch passthrough: returns the upstream body verbatim with
/// a fixed content type, so browser frontends can read feeds that lack
/// CORS headers.
async fn feed_proxy(
    State(state): State<AppState>,
    Query(q): Query<UrlQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let Some(url) = q.url else {
        return Err((StatusCode::BAD_REQUEST, "missing url parameter".to_string()));
    };
    let resp = state
        .proxy_http
        .get(&url)
        .send()
        .await
        .map_err(|e| (StatusCode::BAD_GATEWAY, format!("fetching {url}: {e}")))?;
    if !resp.status().is_success() {
        return Err((
            StatusCode::BAD_GATEWAY,
            format!("failed to fetch {url}: {}", resp.status()),
        ));
    }
    let body = resp
        .text()
        .await
        .map_err(|e| (StatusCode::BAD_GATEWAY, format!("reading {url}: {e}")))?;
    Ok(([(header::CONTENT_TYPE, "application/xml")], body))
}
