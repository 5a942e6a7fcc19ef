// src/sync/sinks.rs
use anyhow::{Context, Result};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

use crate::sync::event_log::{Severity, SyncEvent};
use crate::sync::types::EventSink;

/// Pushes events to a Slack-compatible incoming webhook (`{"text": ...}`).
///
/// Posts run on their own tasks, at most `MAX_IN_FLIGHT` at once; extra events
/// are dropped. Delivery failures are logged and never reach the pipeline.
pub struct WebhookSink {
    webhook_url: Option<String>,
    client: Client,
    min_severity: Severity,
    in_flight: Arc<Semaphore>,
}

const MAX_IN_FLIGHT: usize = 8;

impl WebhookSink {
    pub fn from_env() -> Self {
        Self {
            webhook_url: std::env::var("SYNC_WEBHOOK_URL")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            client: Client::new(),
            min_severity: Severity::Success,
            in_flight: Arc::new(Semaphore::new(MAX_IN_FLIGHT)),
        }
    }

    pub fn new(url: String) -> Self {
        Self {
            webhook_url: Some(url),
            client: Client::new(),
            min_severity: Severity::Success,
            in_flight: Arc::new(Semaphore::new(MAX_IN_FLIGHT)),
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        if let Ok(c) = Client::builder().timeout(Duration::from_secs(secs)).build() {
            self.client = c;
        }
        self
    }

    pub fn with_min_severity(mut self, s: Severity) -> Self {
        self.min_severity = s;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.webhook_url.is_some()
    }

    fn wants(&self, s: Severity) -> bool {
        rank(s) >= rank(self.min_severity)
    }
}

fn render(ev: &SyncEvent) -> String {
    format!(
        "*feed-sync* [{}] {}\n@ {}",
        severity_label(ev.severity),
        ev.message,
        ev.timestamp.to_rfc3339()
    )
}

async fn post(client: &Client, url: &str, text: String) -> Result<()> {
    let body = serde_json::json!({ "text": text });
    client
        .post(url)
        .json(&body)
        .send()
        .await
        .context("webhook post")?
        .error_for_status()
        .context("webhook non-2xx")?;
    Ok(())
}

fn rank(s: Severity) -> u8 {
    match s {
        Severity::Info => 0,
        Severity::Success => 1,
        Severity::Warning => 2,
        Severity::Error => 3,
    }
}

fn severity_label(s: Severity) -> &'static str {
    match s {
        Severity::Info => "info",
        Severity::Success => "success",
        Severity::Warning => "warning",
        Severity::Error => "error",
    }
}

#[async_trait::async_trait]
impl EventSink for WebhookSink {
    async fn on_event(&self, ev: &SyncEvent) {
        let Some(url) = &self.webhook_url else {
            return;
        };
        if !self.wants(ev.severity) {
            return;
        }
        let Ok(permit) = self.in_flight.clone().try_acquire_owned() else {
            tracing::warn!(target: "sync", "event webhook saturated, event dropped");
            return;
        };
        let client = self.client.clone();
        let url = url.clone();
        let text = render(ev);
        tokio::spawn(async move {
            if let Err(e) = post(&client, &url, text).await {
                tracing::warn!(target: "sync", "event webhook failed: {e:#}");
            }
            drop(permit);
        });
    }
}
