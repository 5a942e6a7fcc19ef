// src/sync/dedup.rs
use anyhow::{Context, Result};
use std::sync::Arc;

use crate::sync::types::ArticleStore;

pub const KEY_FIELD: &str = "url";

/// Read-before-write existence check on the natural key.
///
/// No URL normalization: trailing slashes, query strings or scheme changes
/// produce distinct keys. Holds no lock; overlapping runs are prevented by the
/// orchestrator's single-flight flag.
#[derive(Clone)]
pub struct DedupGate {
    store: Arc<dyn ArticleStore>,
    collection: String,
}

impl DedupGate {
    pub fn new(store: Arc<dyn ArticleStore>, collection: impl Into<String>) -> Self {
        Self {
            store,
            collection: collection.into(),
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub async fn exists(&self, url: &str) -> Result<bool> {
        let hit = self
            .store
            .find_by_key(&self.collection, KEY_FIELD, url)
            .await
            .with_context(|| format!("dedup lookup for {url}"))?;
        Ok(hit.is_some())
    }
}
