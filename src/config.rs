// src/config.rs
//! Runtime configuration, read from the environment (`.env` honored in dev).

use anyhow::{bail, Context, Result};
use std::time::Duration;

use crate::sync::event_log::DEFAULT_LOG_CAPACITY;
use crate::sync::providers::rss2json::DEFAULT_RSS2JSON_ENDPOINT;
use crate::sync::{DEFAULT_COLLECTION, DEFAULT_MAX_ITEMS, DEFAULT_SAMPLE_ITEMS};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetcherKind {
    /// Direct HTTP GET + RSS XML parsing.
    Xml,
    /// rss2json-style conversion API.
    Rss2Json,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    pub fetcher: FetcherKind,
    pub rss2json_endpoint: String,
    pub rss2json_api_key: Option<String>,
    pub max_items: usize,
    pub sample_items: usize,
    pub log_capacity: usize,
    pub collection: String,
    pub interval: Option<Duration>,
    pub http_timeout: Option<Duration>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            fetcher: FetcherKind::Xml,
            rss2json_endpoint: DEFAULT_RSS2JSON_ENDPOINT.to_string(),
            rss2json_api_key: None,
            max_items: DEFAULT_MAX_ITEMS,
            sample_items: DEFAULT_SAMPLE_ITEMS,
            log_capacity: DEFAULT_LOG_CAPACITY,
            collection: DEFAULT_COLLECTION.to_string(),
            interval: None,
            http_timeout: Some(Duration::from_secs(20)),
        }
    }
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_usize(key: &str, default: usize) -> Result<usize> {
    match env_opt(key) {
        None => Ok(default),
        Some(v) => v
            .parse::<usize>()
            .with_context(|| format!("{key} must be a positive integer, got {v:?}")),
    }
}

impl SyncConfig {
    pub fn from_env() -> Result<Self> {
        let d = Self::default();

        let fetcher = match env_opt("SYNC_FETCHER").map(|v| v.to_ascii_lowercase()) {
            None => d.fetcher,
            Some(v) if v == "xml" || v == "rss" => FetcherKind::Xml,
            Some(v) if v == "rss2json" => FetcherKind::Rss2Json,
            Some(other) => bail!("unsupported SYNC_FETCHER: {other}"),
        };

        let interval = match env_usize("SYNC_INTERVAL_SECS", 0)? {
            0 => None,
            secs => Some(Duration::from_secs(secs as u64)),
        };
        let http_timeout = match env_usize("SYNC_HTTP_TIMEOUT_SECS", 20)? {
            0 => None,
            secs => Some(Duration::from_secs(secs as u64)),
        };

        Ok(Self {
            fetcher,
            rss2json_endpoint: env_opt("RSS2JSON_ENDPOINT").unwrap_or(d.rss2json_endpoint),
            rss2json_api_key: env_opt("RSS2JSON_API_KEY"),
            max_items: env_usize("SYNC_MAX_ITEMS", d.max_items)?.max(1),
            sample_items: env_usize("SYNC_SAMPLE_ITEMS", d.sample_items)?.max(1),
            log_capacity: env_usize("SYNC_LOG_CAPACITY", d.log_capacity)?.max(1),
            collection: env_opt("SYNC_COLLECTION").unwrap_or(d.collection),
            interval,
            http_timeout,
        })
    }
}
