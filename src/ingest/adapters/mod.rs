// src/ingest/adapters/mod.rs
//! Adapter registry. Order matters: the first adapter whose `validates`
//! accepts a URL claims it, so specific adapters go before broad ones.

pub mod news;
pub mod rss;

use std::sync::Arc;

use crate::ingest::types::SourceAdapter;

pub use news::NewsAdapter;
pub use rss::RssAdapter;

/// The default adapter set, built from the environment.
pub fn default_adapters() -> Vec<Arc<dyn SourceAdapter>> {
    vec![
        Arc::new(NewsAdapter::from_env()),
        Arc::new(RssAdapter::from_env()),
    ]
}

/// Pick the adapter claiming this URL, if any.
pub fn adapter_for<'a>(
    adapters: &'a [Arc<dyn SourceAdapter>],
    url: &str,
) -> Option<&'a Arc<dyn SourceAdapter>> {
    adapters.iter().find(|a| a.validates(url))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guardian_url_is_claimed_by_exactly_one_adapter() {
        let adapters = default_adapters();
        let url = "https://www.theguardian.com/environment";
        let claimed: Vec<_> = adapters.iter().filter(|a| a.validates(url)).collect();
        assert_eq!(claimed.len(), 1);
        assert_eq!(adapter_for(&adapters, url).unwrap().name(), "news");
    }

    #[test]
    fn unknown_url_matches_no_adapter() {
        let adapters = default_adapters();
        assert!(adapter_for(&adapters, "https://example.com/about").is_none());
    }
}
