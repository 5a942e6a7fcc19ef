// src/sync/mod.rs
pub mod dedup;
pub mod event_log;
pub mod mapper;
pub mod normalize;
pub mod providers;
pub mod registry;
pub mod scheduler;
pub mod sinks;
pub mod store;
pub mod types;

use anyhow::{bail, Context, Result};
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use once_cell::sync::OnceCell;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::sync::dedup::DedupGate;
use crate::sync::event_log::{EventLog, Severity, SyncEvent};
use crate::sync::mapper::map_item;
use crate::sync::registry::{SourceDescriptor, SourceRegistry};
use crate::sync::types::{ArticleStore, EventSink, FeedFetcher, RawItem};

pub const DEFAULT_MAX_ITEMS: usize = 20;
pub const DEFAULT_SAMPLE_ITEMS: usize = 3;
pub const DEFAULT_COLLECTION: &str = "articles";

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("sync_runs_total", "Full sync runs started.");
        describe_counter!(
            "sync_rejected_total",
            "Full sync calls rejected because a run was in flight."
        );
        describe_counter!("sync_run_failures_total", "Full sync runs aborted by a source.");
        describe_counter!("sync_items_processed_total", "Feed items looked at.");
        describe_counter!("sync_articles_added_total", "Articles written to the store.");
        describe_counter!("sync_duplicates_total", "Items skipped by the dedup gate.");
        describe_counter!("sync_item_errors_total", "Items that failed mapping or persistence.");
        describe_histogram!("sync_fetch_ms", "Feed fetch time in milliseconds.");
        describe_histogram!("sync_parse_ms", "Feed parse time in milliseconds.");
        describe_counter!("sync_scheduler_ticks_total", "Periodic sync triggers fired.");
        describe_gauge!("sync_last_run_ts", "Unix ts of the last completed full sync.");
    });
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SourceTally {
    pub added: usize,
    pub processed: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncTotals {
    pub added: usize,
    pub processed: usize,
    pub sources: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    Completed(SyncTotals),
    /// Another full run was in flight; nothing was fetched or written.
    AlreadyRunning,
}

/// Result of a single-source sync requested from outside a full run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceOutcome {
    Completed(SourceTally),
    /// A full run or another source sync holds the running flag.
    AlreadyRunning,
}

/// Reachability report for one source, produced by `test_feeds`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedProbe {
    pub feed_url: String,
    pub category: String,
    pub partition: String,
    pub reachable: bool,
    pub item_count: usize,
    pub status: String,
    pub error: Option<String>,
    pub sample_titles: Vec<String>,
}

/// Resets the running flag when dropped, on success, error or panic.
struct RunGuard<'a>(&'a AtomicBool);

impl<'a> RunGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Drives the pipeline: sources in registry order, items in feed order,
/// map -> dedup -> insert per item.
pub struct SyncOrchestrator {
    registry: SourceRegistry,
    fetcher: Arc<dyn FeedFetcher>,
    store: Arc<dyn ArticleStore>,
    gate: DedupGate,
    log: Arc<EventLog>,
    sinks: Vec<Arc<dyn EventSink>>,
    running: AtomicBool,
    max_items: usize,
    sample_items: usize,
}

impl SyncOrchestrator {
    pub fn new(
        registry: SourceRegistry,
        fetcher: Arc<dyn FeedFetcher>,
        store: Arc<dyn ArticleStore>,
    ) -> Self {
        Self {
            registry,
            fetcher,
            gate: DedupGate::new(store.clone(), DEFAULT_COLLECTION),
            store,
            log: Arc::new(EventLog::default()),
            sinks: Vec::new(),
            running: AtomicBool::new(false),
            max_items: DEFAULT_MAX_ITEMS,
            sample_items: DEFAULT_SAMPLE_ITEMS,
        }
    }

    pub fn with_collection(mut self, collection: &str) -> Self {
        self.gate = DedupGate::new(self.store.clone(), collection);
        self
    }

    pub fn with_event_log(mut self, log: Arc<EventLog>) -> Self {
        self.log = log;
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn with_max_items(mut self, n: usize) -> Self {
        self.max_items = n.max(1);
        self
    }

    pub fn with_sample_items(mut self, n: usize) -> Self {
        self.sample_items = n.max(1);
        self
    }

    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    pub fn collection(&self) -> &str {
        self.gate.collection()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn logs(&self, limit: usize) -> Vec<SyncEvent> {
        self.log.query(limit)
    }

    pub fn clear_logs(&self) -> SyncEvent {
        self.log.clear()
    }

    async fn emit(&self, message: impl Into<String>, severity: Severity) {
        let ev = self.log.record(message, severity);
        match severity {
            Severity::Info | Severity::Success => {
                tracing::info!(target: "sync", severity = ?severity, "{}", ev.message)
            }
            Severity::Warning => tracing::warn!(target: "sync", "{}", ev.message),
            Severity::Error => tracing::error!(target: "sync", "{}", ev.message),
        }
        for sink in &self.sinks {
            sink.on_event(&ev).await;
        }
    }

    /// Full run over every registered source with the default item cap.
    pub async fn sync_all(&self) -> Result<SyncOutcome> {
        self.sync_all_with_cap(None).await
    }

    /// Full run. A second call while one is in flight returns
    /// `SyncOutcome::AlreadyRunning` without fetching anything. A source fetch
    /// failure aborts the run; items already written stay written.
    pub async fn sync_all_with_cap(&self, cap: Option<usize>) -> Result<SyncOutcome> {
        ensure_metrics_described();

        let Some(guard) = RunGuard::acquire(&self.running) else {
            counter!("sync_rejected_total").increment(1);
            self.emit("Sync already in progress, request ignored", Severity::Warning)
                .await;
            return Ok(SyncOutcome::AlreadyRunning);
        };

        counter!("sync_runs_total").increment(1);
        self.emit(
            format!("Sync started for {} sources", self.registry.len()),
            Severity::Info,
        )
        .await;

        let mut totals = SyncTotals::default();
        for source in self.registry.iter() {
            match self.sync_source_inner(source, cap).await {
                Ok(t) => {
                    totals.added += t.added;
                    totals.processed += t.processed;
                    totals.sources += 1;
                }
                Err(e) => {
                    drop(guard);
                    counter!("sync_run_failures_total").increment(1);
                    self.emit(
                        format!("Sync aborted at {}: {e:#}", source.feed_url),
                        Severity::Error,
                    )
                    .await;
                    return Err(e);
                }
            }
        }

        drop(guard);
        let now = chrono::Utc::now().timestamp().max(0) as f64;
        gauge!("sync_last_run_ts").set(now);
        self.emit(
            format!(
                "Sync finished: {} added, {} processed across {} sources",
                totals.added, totals.processed, totals.sources
            ),
            Severity::Success,
        )
        .await;
        Ok(SyncOutcome::Completed(totals))
    }

    /// Sync one source on its own. Shares the running flag with `sync_all`,
    /// so it never overlaps a full run or another source sync.
    pub async fn sync_source(
        &self,
        source: &SourceDescriptor,
        cap: Option<usize>,
    ) -> Result<SourceOutcome> {
        ensure_metrics_described();
        let Some(_guard) = RunGuard::acquire(&self.running) else {
            counter!("sync_rejected_total").increment(1);
            self.emit(
                format!("Sync already in progress, {} not synced", source.feed_url),
                Severity::Warning,
            )
            .await;
            return Ok(SourceOutcome::AlreadyRunning);
        };
        self.sync_source_inner(source, cap)
            .await
            .map(SourceOutcome::Completed)
    }

    /// Fetch failures propagate; per-item failures are logged and the loop
    /// moves on. Callers must hold the running flag.
    async fn sync_source_inner(
        &self,
        source: &SourceDescriptor,
        cap: Option<usize>,
    ) -> Result<SourceTally> {
        let limit = cap.unwrap_or(self.max_items).max(1);
        self.emit(
            format!("Fetching {} ({})", source.feed_url, source.category),
            Severity::Info,
        )
        .await;

        let t0 = std::time::Instant::now();
        let fetched = self
            .fetcher
            .fetch(&source.feed_url, limit)
            .await
            .with_context(|| format!("fetching {}", source.feed_url));
        histogram!("sync_fetch_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);

        let resp = match fetched {
            Ok(r) if r.is_ok() => r,
            Ok(r) => {
                let msg = r.message.unwrap_or_default();
                self.emit(
                    format!("Feed {} answered status {}: {msg}", source.feed_url, r.status),
                    Severity::Error,
                )
                .await;
                bail!("feed {} answered status {}: {msg}", source.feed_url, r.status);
            }
            Err(e) => {
                self.emit(format!("Fetch failed: {e:#}"), Severity::Error).await;
                return Err(e);
            }
        };

        let mut tally = SourceTally::default();
        for item in resp.items.iter().take(limit) {
            tally.processed += 1;
            match self.sync_item(item, source).await {
                Ok(true) => tally.added += 1,
                Ok(false) => counter!("sync_duplicates_total").increment(1),
                Err(e) => {
                    counter!("sync_item_errors_total").increment(1);
                    self.emit(
                        format!("Failed to import \"{}\": {e:#}", item_label(item)),
                        Severity::Error,
                    )
                    .await;
                }
            }
        }

        counter!("sync_items_processed_total").increment(tally.processed as u64);
        counter!("sync_articles_added_total").increment(tally.added as u64);
        self.emit(
            format!(
                "{}: {} added, {} processed",
                source.feed_url, tally.added, tally.processed
            ),
            Severity::Success,
        )
        .await;
        Ok(tally)
    }

    /// Returns true when the item was written, false when it already existed.
    async fn sync_item(&self, item: &RawItem, source: &SourceDescriptor) -> Result<bool> {
        let record = map_item(item, source)?;
        if self.gate.exists(&record.url).await? {
            return Ok(false);
        }
        self.store
            .insert(self.gate.collection(), record)
            .await
            .with_context(|| format!("inserting {}", item.link))?;
        Ok(true)
    }

    /// Fetch a small sample from every source and report reachability.
    /// Never touches the store and never fails as a whole.
    pub async fn test_feeds(&self, sample: Option<usize>) -> Vec<FeedProbe> {
        let limit = sample.unwrap_or(self.sample_items).max(1);
        self.emit(
            format!("Testing {} feeds", self.registry.len()),
            Severity::Info,
        )
        .await;

        let mut out = Vec::with_capacity(self.registry.len());
        for source in self.registry.iter() {
            let mut probe = FeedProbe {
                feed_url: source.feed_url.clone(),
                category: source.category.to_string(),
                partition: source.partition.clone(),
                reachable: false,
                item_count: 0,
                status: "error".to_string(),
                error: None,
                sample_titles: Vec::new(),
            };

            match self.fetcher.fetch(&source.feed_url, limit).await {
                Ok(resp) if resp.is_ok() => {
                    probe.reachable = true;
                    probe.sample_titles = resp
                        .items
                        .iter()
                        .take(limit)
                        .map(|it| it.title.as_deref().unwrap_or_default().trim().to_string())
                        .collect();
                    probe.item_count = probe.sample_titles.len();
                    probe.status = resp.status;
                    self.emit(
                        format!("{} OK, {} items", source.feed_url, probe.item_count),
                        Severity::Success,
                    )
                    .await;
                }
                Ok(resp) => {
                    probe.status = resp.status;
                    probe.error = resp.message;
                    self.emit(
                        format!("{} answered status {}", source.feed_url, probe.status),
                        Severity::Warning,
                    )
                    .await;
                }
                Err(e) => {
                    probe.error = Some(format!("{e:#}"));
                    self.emit(
                        format!("{} unreachable: {e:#}", source.feed_url),
                        Severity::Error,
                    )
                    .await;
                }
            }
            out.push(probe);
        }
        out
    }
}

fn item_label(item: &RawItem) -> &str {
    item.title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(item.link.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::registry::Category;
    use crate::sync::store::InMemoryStore;
    use crate::sync::types::FetchResponse;

    struct StaticFetcher(Vec<RawItem>);

    #[async_trait::async_trait]
    impl FeedFetcher for StaticFetcher {
        async fn fetch(&self, _url: &str, max: usize) -> Result<FetchResponse> {
            Ok(FetchResponse::ok(self.0.iter().take(max).cloned().collect()))
        }
        fn name(&self) -> &'static str {
            "static"
        }
    }

    fn raw(link: &str, title: &str) -> RawItem {
        RawItem {
            title: Some(title.into()),
            link: link.into(),
            ..Default::default()
        }
    }

    fn orchestrator(items: Vec<RawItem>) -> (SyncOrchestrator, Arc<InMemoryStore>) {
        let store = Arc::new(InMemoryStore::new());
        let reg = SourceRegistry::new(vec![SourceDescriptor::new(
            "https://example.com/feed",
            Category::Hotel,
            "guide",
        )])
        .unwrap();
        let orch = SyncOrchestrator::new(reg, Arc::new(StaticFetcher(items)), store.clone());
        (orch, store)
    }

    #[tokio::test]
    async fn cap_bounds_processed_items() {
        let items = (0..5)
            .map(|i| raw(&format!("https://example.com/{i}"), "t"))
            .collect();
        let (orch, store) = orchestrator(items);
        let out = orch.sync_all_with_cap(Some(2)).await.unwrap();
        assert_eq!(
            out,
            SyncOutcome::Completed(SyncTotals {
                added: 2,
                processed: 2,
                sources: 1
            })
        );
        assert_eq!(store.count(DEFAULT_COLLECTION), 2);
    }

    #[tokio::test]
    async fn duplicate_links_within_one_feed_insert_once() {
        let (orch, store) = orchestrator(vec![
            raw("https://example.com/a", "one"),
            raw("https://example.com/a", "again"),
        ]);
        let SyncOutcome::Completed(t) = orch.sync_all().await.unwrap() else {
            panic!("expected completed run");
        };
        assert_eq!((t.added, t.processed), (1, 2));
        assert_eq!(store.count(DEFAULT_COLLECTION), 1);
    }

    #[tokio::test]
    async fn flag_is_clear_after_run() {
        let (orch, _) = orchestrator(vec![]);
        assert!(!orch.is_running());
        orch.sync_all().await.unwrap();
        assert!(!orch.is_running());
        let logs = orch.logs(10);
        assert_eq!(logs[0].severity, Severity::Success);
    }

    #[tokio::test]
    async fn custom_collection_is_used_for_writes() {
        let (orch, store) = orchestrator(vec![raw("https://example.com/a", "one")]);
        let orch = orch.with_collection("guide_articles");
        orch.sync_all().await.unwrap();
        assert_eq!(store.count("guide_articles"), 1);
        assert_eq!(store.count(DEFAULT_COLLECTION), 0);
    }

    #[test]
    fn item_label_falls_back_to_link() {
        let mut it = raw("https://example.com/x", "  ");
        assert_eq!(item_label(&it), "https://example.com/x");
        it.title = Some(" Name ".into());
        assert_eq!(item_label(&it), "Name");
    }

    /// Hands back every item it has, whatever the requested count.
    struct UncappedFetcher(Vec<RawItem>);

    #[async_trait::async_trait]
    impl FeedFetcher for UncappedFetcher {
        async fn fetch(&self, _url: &str, _max: usize) -> Result<FetchResponse> {
            Ok(FetchResponse::ok(self.0.clone()))
        }
        fn name(&self) -> &'static str {
            "uncapped"
        }
    }

    #[tokio::test]
    async fn feed_test_counts_only_the_requested_sample() {
        let items: Vec<RawItem> = (0..6)
            .map(|i| raw(&format!("https://example.com/{i}"), "t"))
            .collect();
        let reg = SourceRegistry::new(vec![SourceDescriptor::new(
            "https://example.com/feed",
            Category::News,
            "mag",
        )])
        .unwrap();
        let orch = SyncOrchestrator::new(
            reg,
            Arc::new(UncappedFetcher(items)),
            Arc::new(InMemoryStore::new()),
        );

        let probes = orch.test_feeds(Some(2)).await;
        assert_eq!(probes[0].item_count, 2);
        assert_eq!(probes[0].sample_titles.len(), 2);
    }

    #[tokio::test]
    async fn source_sync_outside_a_run_releases_the_flag() {
        let (orch, store) = orchestrator(vec![raw("https://example.com/a", "one")]);
        let source = orch.registry().sources()[0].clone();
        let out = orch.sync_source(&source, None).await.unwrap();
        assert_eq!(
            out,
            SourceOutcome::Completed(SourceTally {
                added: 1,
                processed: 1
            })
        );
        assert!(!orch.is_running());
        assert_eq!(store.count(DEFAULT_COLLECTION), 1);
    }
}
