// src/ingest/classify.rs
//! Keyword bucket rules: user-defined keyword-to-label classification.

use serde::{Deserialize, Serialize};

use crate::ingest::types::Resource;

/// One classification rule: attach `name` as a tag when any keyword is a
/// case-insensitive substring of the resource's title + summary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BucketRule {
    /// Label to attach, e.g. "Forests".
    pub name: String,
    /// Match tokens, e.g. ["tree", "logging", "canopy"].
    pub keywords: Vec<String>,
}

/// Apply bucket rules to a batch of resources.
///
/// Pure and total. With no rules the input is returned unchanged. A
/// resource may collect tags from multiple rules (union in rule order, not
/// first-match); a resource matching nothing keeps `tags: None`. Input
/// order is preserved.
///
/// Matching is a plain substring check, so a keyword like "log" matches
/// inside "dialogue". That looseness is intentional; tighten only if the
/// rules format grows a tokenization option.
pub fn apply_buckets(resources: Vec<Resource>, rules: &[BucketRule]) -> Vec<Resource> {
    if rules.is_empty() {
        return resources;
    }

    resources
        .into_iter()
        .map(|mut res| {
            let text = format!("{} {}", res.title, res.summary).to_lowercase();

            let tags: Vec<String> = rules
                .iter()
                .filter(|rule| {
                    rule.keywords
                        .iter()
                        .any(|k| text.contains(&k.to_lowercase()))
                })
                .map(|rule| rule.name.clone())
                .collect();

            if !tags.is_empty() {
                res.tags = Some(tags);
            }
            res
        })
        .collect()
}
