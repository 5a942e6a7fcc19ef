// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod api;
pub mod config;
pub mod metrics;
pub mod sync;

use anyhow::Result;
use std::sync::Arc;

use crate::config::{FetcherKind, SyncConfig};
use crate::sync::event_log::EventLog;
use crate::sync::providers::{rss2json::Rss2JsonFetcher, rss_xml::RssXmlFetcher};
use crate::sync::registry::SourceRegistry;
use crate::sync::sinks::WebhookSink;
use crate::sync::types::{ArticleStore, FeedFetcher};

// ---- Re-exports for stable public API ----
pub use crate::api::router;
pub use crate::sync::{
    FeedProbe, SourceOutcome, SourceTally, SyncOrchestrator, SyncOutcome, SyncTotals,
};

/// Build the feed-fetch adapter selected by configuration.
pub fn build_fetcher(cfg: &SyncConfig) -> Result<Arc<dyn FeedFetcher>> {
    Ok(match cfg.fetcher {
        FetcherKind::Xml => Arc::new(RssXmlFetcher::http(cfg.http_timeout)?),
        FetcherKind::Rss2Json => Arc::new(Rss2JsonFetcher::new(
            &cfg.rss2json_endpoint,
            cfg.rss2json_api_key.clone(),
            cfg.http_timeout,
        )?),
    })
}

/// Wire an orchestrator from configuration around the given store.
pub fn build_orchestrator(
    cfg: &SyncConfig,
    registry: SourceRegistry,
    store: Arc<dyn ArticleStore>,
) -> Result<SyncOrchestrator> {
    let fetcher = build_fetcher(cfg)?;
    let mut orch = SyncOrchestrator::new(registry, fetcher, store)
        .with_collection(&cfg.collection)
        .with_event_log(Arc::new(EventLog::with_capacity(cfg.log_capacity)))
        .with_max_items(cfg.max_items)
        .with_sample_items(cfg.sample_items);

    let webhook = WebhookSink::from_env();
    if webhook.is_enabled() {
        tracing::info!(target: "sync", "event webhook enabled");
        orch = orch.with_sink(Arc::new(webhook.with_timeout(5)));
    }
    Ok(orch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::store::InMemoryStore;

    #[serial_test::serial]
    #[test]
    fn orchestrator_is_wired_from_config() {
        std::env::remove_var("SYNC_WEBHOOK_URL");
        let cfg = SyncConfig {
            collection: "guide_articles".into(),
            fetcher: FetcherKind::Rss2Json,
            ..SyncConfig::default()
        };
        let orch = build_orchestrator(
            &cfg,
            SourceRegistry::default_seed(),
            Arc::new(InMemoryStore::new()),
        )
        .unwrap();
        assert_eq!(orch.collection(), "guide_articles");
        assert_eq!(orch.registry().len(), SourceRegistry::default_seed().len());
        assert!(!orch.is_running());
    }
}
