// src/sync/types.rs
use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::sync::event_log::SyncEvent;
use crate::sync::mapper::{ArticleRecord, StoredArticle};

/// One item as handed over by a feed-fetch adapter, before any normalization.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RawItem {
    pub title: Option<String>,
    pub link: String, // natural key
    pub published_at: Option<String>,
    pub body_html: Option<String>,
    pub summary_html: Option<String>,
    pub thumbnail_url: Option<String>,
    pub enclosure_url: Option<String>,
}

/// Result of one fetch call. `status` is "ok" on success; anything else is
/// treated as fatal for the source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: String,
    pub message: Option<String>,
    pub items: Vec<RawItem>,
}

impl FetchResponse {
    pub fn ok(items: Vec<RawItem>) -> Self {
        Self {
            status: "ok".to_string(),
            message: None,
            items,
        }
    }

    pub fn failed(status: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            message: Some(message.into()),
            items: Vec::new(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status.eq_ignore_ascii_case("ok")
    }
}

#[async_trait::async_trait]
pub trait FeedFetcher: Send + Sync {
    /// Fetch at most `max_items` items from `feed_url`, in feed order.
    async fn fetch(&self, feed_url: &str, max_items: usize) -> Result<FetchResponse>;
    fn name(&self) -> &'static str;
}

#[async_trait::async_trait]
pub trait ArticleStore: Send + Sync {
    /// Exact-match lookup, zero or one record.
    async fn find_by_key(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> Result<Option<StoredArticle>>;

    /// Persist a record; the store assigns id and timestamps.
    async fn insert(&self, collection: &str, record: ArticleRecord) -> Result<StoredArticle>;
}

/// Push-style observer for pipeline events.
#[async_trait::async_trait]
pub trait EventSink: Send + Sync {
    async fn on_event(&self, event: &SyncEvent);
}
