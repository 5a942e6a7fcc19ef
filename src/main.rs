//! Feed Sync Service: binary entrypoint
//! Boots the Axum HTTP server over the sync orchestrator, optionally with a
//! periodic trigger.

use std::sync::Arc;

use guide_feed_sync::api::{self, AppState};
use guide_feed_sync::build_orchestrator;
use guide_feed_sync::config::SyncConfig;
use guide_feed_sync::metrics::Metrics;
use guide_feed_sync::sync::registry::SourceRegistry;
use guide_feed_sync::sync::scheduler::spawn_sync_scheduler;
use guide_feed_sync::sync::store::InMemoryStore;
use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Enable compact tracing logs in development only.
/// Activation requires BOTH:
///   - dev environment (debug build OR SHUTTLE_ENV in {local, development, dev})
///   - SYNC_DEV_LOG=1
fn enable_dev_tracing() {
    let dev_flag = std::env::var("SYNC_DEV_LOG")
        .ok()
        .is_some_and(|v| v == "1");

    let is_dev_env = cfg!(debug_assertions)
        || matches!(
            std::env::var("SHUTTLE_ENV")
                .unwrap_or_default()
                .to_ascii_lowercase()
                .as_str(),
            "local" | "development" | "dev"
        );

    if !(dev_flag && is_dev_env) {
        return;
    }

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("sync=info,warn"));

    // The runtime may already own a global subscriber.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .try_init();
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    enable_dev_tracing();

    let cfg = SyncConfig::from_env()?;
    let registry = SourceRegistry::load_default()?;
    tracing::info!(
        target: "sync",
        sources = registry.len(),
        fetcher = ?cfg.fetcher,
        "feed sync service starting"
    );

    let store = Arc::new(InMemoryStore::new());
    let orchestrator = Arc::new(build_orchestrator(&cfg, registry, store)?);

    if let Some(interval) = cfg.interval {
        spawn_sync_scheduler(orchestrator.clone(), interval);
    }

    let mut router = api::router(AppState::new(orchestrator));
    match Metrics::init() {
        Ok(m) => router = router.merge(m.router()),
        Err(e) => tracing::warn!("metrics disabled: {e:#}"),
    }

    Ok(router.into())
}
