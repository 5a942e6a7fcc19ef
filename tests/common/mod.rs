// tests/common/mod.rs
// Shared mock collaborators for integration tests.
#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

use guide_feed_sync::sync::event_log::SyncEvent;
use guide_feed_sync::sync::mapper::{ArticleRecord, StoredArticle};
use guide_feed_sync::sync::registry::{Category, SourceDescriptor, SourceRegistry};
use guide_feed_sync::sync::store::InMemoryStore;
use guide_feed_sync::sync::types::{
    ArticleStore, EventSink, FeedFetcher, FetchResponse, RawItem,
};

pub fn raw(link: &str, title: Option<&str>, body: Option<&str>) -> RawItem {
    RawItem {
        title: title.map(str::to_string),
        link: link.to_string(),
        body_html: body.map(str::to_string),
        ..Default::default()
    }
}

pub fn registry(urls: &[&str]) -> SourceRegistry {
    SourceRegistry::new(
        urls.iter()
            .map(|u| SourceDescriptor::new(u, Category::Hotel, "guide"))
            .collect(),
    )
    .unwrap()
}

/// Per-URL canned responses; unknown URLs are transport errors.
#[derive(Default)]
pub struct MapFetcher {
    pub feeds: HashMap<String, Result<FetchResponse, String>>,
    pub calls: Mutex<Vec<String>>,
}

impl MapFetcher {
    pub fn with_items(mut self, url: &str, items: Vec<RawItem>) -> Self {
        self.feeds.insert(url.to_string(), Ok(FetchResponse::ok(items)));
        self
    }

    pub fn with_status(mut self, url: &str, status: &str, msg: &str) -> Self {
        self.feeds
            .insert(url.to_string(), Ok(FetchResponse::failed(status, msg)));
        self
    }

    pub fn with_error(mut self, url: &str, msg: &str) -> Self {
        self.feeds.insert(url.to_string(), Err(msg.to_string()));
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl FeedFetcher for MapFetcher {
    async fn fetch(&self, feed_url: &str, max_items: usize) -> Result<FetchResponse> {
        self.calls.lock().unwrap().push(feed_url.to_string());
        match self.feeds.get(feed_url) {
            Some(Ok(resp)) => {
                let mut r = resp.clone();
                r.items.truncate(max_items);
                Ok(r)
            }
            Some(Err(msg)) => Err(anyhow!("{msg}")),
            None => Err(anyhow!("connection refused: {feed_url}")),
        }
    }

    fn name(&self) -> &'static str {
        "map"
    }
}

/// Blocks inside `fetch` until released, to hold a run in flight.
pub struct GateFetcher {
    pub items: Vec<RawItem>,
    pub entered: Notify,
    pub release: Notify,
    pub calls: AtomicUsize,
}

impl GateFetcher {
    pub fn new(items: Vec<RawItem>) -> Self {
        Self {
            items,
            entered: Notify::new(),
            release: Notify::new(),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl FeedFetcher for GateFetcher {
    async fn fetch(&self, _feed_url: &str, max_items: usize) -> Result<FetchResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.entered.notify_one();
        self.release.notified().await;
        Ok(FetchResponse::ok(
            self.items.iter().take(max_items).cloned().collect(),
        ))
    }

    fn name(&self) -> &'static str {
        "gate"
    }
}

/// In-memory store that refuses to insert the given URLs and counts calls.
pub struct FlakyStore {
    pub inner: InMemoryStore,
    pub poisoned: Vec<String>,
    pub lookups: AtomicUsize,
    pub inserts: AtomicUsize,
}

impl FlakyStore {
    pub fn new(poisoned: &[&str]) -> Self {
        Self {
            inner: InMemoryStore::new(),
            poisoned: poisoned.iter().map(|s| s.to_string()).collect(),
            lookups: AtomicUsize::new(0),
            inserts: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ArticleStore for FlakyStore {
    async fn find_by_key(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> Result<Option<StoredArticle>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.inner.find_by_key(collection, field, value).await
    }

    async fn insert(&self, collection: &str, record: ArticleRecord) -> Result<StoredArticle> {
        self.inserts.fetch_add(1, Ordering::SeqCst);
        if self.poisoned.contains(&record.url) {
            return Err(anyhow!("write rejected for {}", record.url));
        }
        self.inner.insert(collection, record).await
    }
}

/// Collects pushed events.
#[derive(Default)]
pub struct CollectSink {
    pub events: Mutex<Vec<SyncEvent>>,
}

#[async_trait]
impl EventSink for CollectSink {
    async fn on_event(&self, event: &SyncEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

pub fn arc<T>(v: T) -> Arc<T> {
    Arc::new(v)
}
