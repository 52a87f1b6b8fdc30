//! Trust-signal merge
//!
//! `verified_links` is merged key by key. Other top-level keys of the
//! document are carried over untouched.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value};
use stak_common::Result;
use tracing::debug;

use crate::db::EnrichmentStore;
use crate::types::EnrichmentSources;

const VERIFIED_LINKS: &str = "verified_links";

pub struct TrustSignalUpdater {
    store: Arc<dyn EnrichmentStore>,
}

impl TrustSignalUpdater {
    pub fn new(store: Arc<dyn EnrichmentStore>) -> Self {
        Self { store }
    }

    /// Merge verified links from `sources`; returns false when there was nothing to add
    pub async fn update_trust_signals(
        &self,
        user_id: &str,
        sources: &EnrichmentSources,
    ) -> Result<bool> {
        let links = verified_links(sources, Utc::now());
        if links.is_empty() {
            return Ok(false);
        }

        let existing = self.store.load_trust_signals(user_id).await?;
        let merged = merge_verified_links(existing, links);
        self.store.upsert_trust_signals(user_id, &merged).await?;

        debug!(user_id, "Merged verified links into trust signals");
        Ok(true)
    }
}

/// Build `{linkedin?, github?, website?}` entries stamped with `now`
pub fn verified_links(sources: &EnrichmentSources, now: DateTime<Utc>) -> Map<String, Value> {
    let verified_at = now.to_rfc3339();
    let candidates = [
        ("linkedin", sources.linkedin_url.as_deref()),
        ("github", sources.github_url.as_deref()),
        ("website", sources.website_urls.first().map(String::as_str)),
    ];

    candidates
        .into_iter()
        .filter_map(|(key, url)| {
            let url = url.filter(|u| !u.trim().is_empty())?;
            Some((
                key.to_string(),
                json!({ "url": url, "verified_at": verified_at }),
            ))
        })
        .collect()
}

/// Merge new links into an existing trust-signal document
pub fn merge_verified_links(existing: Option<Value>, links: Map<String, Value>) -> Value {
    let mut document = match existing {
        Some(Value::Object(map)) => map,
        _ => Map::new(),
    };

    let mut merged = match document.remove(VERIFIED_LINKS) {
        Some(Value::Object(map)) => map,
        _ => Map::new(),
    };
    merged.extend(links);

    document.insert(VERIFIED_LINKS.to_string(), Value::Object(merged));
    Value::Object(document)
}
