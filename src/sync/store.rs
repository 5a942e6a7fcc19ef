// src/sync/store.rs
//! Process-local `ArticleStore`, used by the binaries and by tests.

use anyhow::{bail, Result};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::sync::mapper::{ArticleRecord, StoredArticle};
use crate::sync::types::ArticleStore;

const LOOKUP_FIELDS: &[&str] = &["id", "url", "title", "partition", "category"];

#[derive(Debug, Default)]
pub struct InMemoryStore {
    collections: Mutex<HashMap<String, Vec<StoredArticle>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insertion-ordered copy of one collection.
    pub fn snapshot(&self, collection: &str) -> Vec<StoredArticle> {
        let guard = self.collections.lock().expect("store mutex poisoned");
        guard.get(collection).cloned().unwrap_or_default()
    }

    pub fn count(&self, collection: &str) -> usize {
        let guard = self.collections.lock().expect("store mutex poisoned");
        guard.get(collection).map(Vec::len).unwrap_or(0)
    }
}

/// Stable short id derived from the natural key.
pub(crate) fn record_id(url: &str) -> String {
    use sha2::{Digest, Sha256};
    let digest = Sha256::digest(url.as_bytes());
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

fn field_value<'a>(row: &'a StoredArticle, field: &str) -> Option<&'a str> {
    match field {
        "id" => Some(row.id.as_str()),
        "url" => Some(row.record.url.as_str()),
        "title" => Some(row.record.title.as_str()),
        "partition" => Some(row.record.partition.as_str()),
        "category" => Some(row.record.category.as_str()),
        _ => None,
    }
}

#[async_trait::async_trait]
impl ArticleStore for InMemoryStore {
    async fn find_by_key(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> Result<Option<StoredArticle>> {
        if !LOOKUP_FIELDS.contains(&field) {
            bail!("unsupported lookup field: {field}");
        }
        let guard = self.collections.lock().expect("store mutex poisoned");
        Ok(guard.get(collection).and_then(|rows| {
            rows.iter()
                .find(|r| field_value(r, field) == Some(value))
                .cloned()
        }))
    }

    async fn insert(&self, collection: &str, record: ArticleRecord) -> Result<StoredArticle> {
        let now = Utc::now();
        let stored = StoredArticle {
            id: record_id(&record.url),
            record,
            created_at: now,
            synced_at: now,
        };
        let mut guard = self.collections.lock().expect("store mutex poisoned");
        guard
            .entry(collection.to_string())
            .or_default()
            .push(stored.clone());
        Ok(stored)
    }
}
