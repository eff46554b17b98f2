// src/analytics/mod.rs
//! # Search metrics aggregation
//! Rolls raw per-dimension search-console rows into window totals.
//!
//! The per-row `ctr` reported upstream is discarded and recomputed as an
//! impression-weighted rate, while `position` stays an unweighted mean of
//! per-row averages. The asymmetry mirrors the observed product behavior
//! and is deliberate; keep both formulas exactly as written.

pub mod client;

use serde::{Deserialize, Serialize};

pub use client::SearchMetricsClient;

/// One raw analytics row for the reporting window, dimensioned by whatever
/// `keys` holds (a query string, or an ISO date).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchRow {
    pub keys: Vec<String>,
    #[serde(default)]
    pub clicks: u64,
    #[serde(default)]
    pub impressions: u64,
    /// Click-through rate in [0,1] as reported upstream. Not used by
    /// [`summarize`].
    #[serde(default)]
    pub ctr: f64,
    /// Average ranking position for this row.
    #[serde(default)]
    pub position: f64,
}

/// Aggregated totals for one reporting window.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct MetricsSummary {
    pub clicks: u64,
    pub impressions: u64,
    /// Recomputed impression-weighted rate, in percent.
    pub ctr: f64,
    /// Unweighted arithmetic mean of per-row positions.
    pub position: f64,
}

/// Aggregate rows into a single summary. Total over any row count; zero
/// rows yields the all-zero summary.
pub fn summarize(rows: &[SearchRow]) -> MetricsSummary {
    if rows.is_empty() {
        return MetricsSummary::default();
    }

    let clicks: u64 = rows.iter().map(|r| r.clicks).sum();
    let impressions: u64 = rows.iter().map(|r| r.impressions).sum();

    let ctr = if impressions > 0 {
        clicks as f64 / impressions as f64 * 100.0
    } else {
        0.0
    };
    let position = rows.iter().map(|r| r.position).sum::<f64>() / rows.len() as f64;

    MetricsSummary {
        clicks,
        impressions,
        ctr,
        position,
    }
}
