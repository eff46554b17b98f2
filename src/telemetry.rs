// src/telemetry.rs
use axum::{routing::get, Router};
use metrics::gauge;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

pub struct Telemetry {
    pub handle: PrometheusHandle,
}

impl Telemetry {
    /// Initialize the Prometheus recorder and expose a static gauge with
    /// the configured subscription count.
    pub fn init(subscription_count: usize) -> Self {
        // Default histogram buckets are fine for ingest_parse_ms.
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .expect("prometheus: install recorder");

        gauge!("curator_subscriptions").set(subscription_count as f64);

        Self { handle }
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}
