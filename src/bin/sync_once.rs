//! One-shot CLI: run a full sync (or `--test` the feeds) and print the log.
//!
//! Usage: `sync-once [--test] [--limit N]`

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use guide_feed_sync::config::SyncConfig;
use guide_feed_sync::sync::registry::SourceRegistry;
use guide_feed_sync::sync::store::InMemoryStore;
use guide_feed_sync::{build_orchestrator, SyncOutcome};
use tracing_subscriber::EnvFilter;

struct Args {
    test: bool,
    limit: Option<usize>,
}

fn parse_args() -> Result<Args> {
    let mut out = Args {
        test: false,
        limit: None,
    };
    let mut it = std::env::args().skip(1);
    while let Some(a) = it.next() {
        match a.as_str() {
            "--test" => out.test = true,
            "--limit" => {
                let v = it.next().context("--limit needs a value")?;
                out.limit = Some(v.parse().with_context(|| format!("bad --limit {v:?}"))?);
            }
            other => bail!("unknown argument: {other}"),
        }
    }
    Ok(out)
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let filter = EnvFilter::try_from_env("SYNC_LOG").unwrap_or_else(|_| EnvFilter::new("sync=info,warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let args = parse_args()?;
    let cfg = SyncConfig::from_env()?;
    let registry = SourceRegistry::load_default()?;
    let store = Arc::new(InMemoryStore::new());
    let orch = build_orchestrator(&cfg, registry, store.clone())?;

    if args.test {
        let probes = orch.test_feeds(args.limit).await;
        println!("{}", serde_json::to_string_pretty(&probes)?);
        return Ok(());
    }

    match orch.sync_all_with_cap(args.limit).await? {
        SyncOutcome::Completed(t) => println!(
            "sync done: {} added, {} processed, {} sources ({} stored)",
            t.added,
            t.processed,
            t.sources,
            store.count(orch.collection())
        ),
        SyncOutcome::AlreadyRunning => println!("sync already in progress"),
    }

    for ev in orch.logs(cfg.log_capacity).iter().rev() {
        println!("{} [{:?}] {}", ev.timestamp.to_rfc3339(), ev.severity, ev.message);
    }
    Ok(())
}
