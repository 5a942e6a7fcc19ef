//! # Event Log
//! Bounded in-memory ring of pipeline events, newest first.
//!
//! The orchestrator records every state-relevant action here; observers poll
//! it via `query`. Nothing is persisted beyond the process lifetime.

use std::{collections::VecDeque, sync::Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_LOG_CAPACITY: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncEvent {
    pub timestamp: DateTime<Utc>,
    pub message: String,
    pub severity: Severity,
}

impl SyncEvent {
    pub fn now(message: impl Into<String>, severity: Severity) -> Self {
        Self {
            timestamp: Utc::now(),
            message: message.into(),
            severity,
        }
    }
}

/// Thread-safe, capacity-bounded event buffer.
#[derive(Debug)]
pub struct EventLog {
    inner: Mutex<VecDeque<SyncEvent>>,
    cap: usize,
}

impl Default for EventLog {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_LOG_CAPACITY)
    }
}

impl EventLog {
    pub fn with_capacity(cap: usize) -> Self {
        let cap = cap.max(1);
        Self {
            inner: Mutex::new(VecDeque::with_capacity(cap)),
            cap,
        }
    }

    pub fn capacity(&self) -> usize {
        self.cap
    }

    /// Prepend an entry, evicting the oldest when over capacity.
    pub fn record(&self, message: impl Into<String>, severity: Severity) -> SyncEvent {
        let ev = SyncEvent::now(message, severity);
        self.push(ev.clone());
        ev
    }

    pub fn push(&self, ev: SyncEvent) {
        let mut buf = self.inner.lock().expect("event log mutex poisoned");
        buf.push_front(ev);
        buf.truncate(self.cap);
    }

    /// Newest-first snapshot of at most `limit` entries.
    pub fn query(&self, limit: usize) -> Vec<SyncEvent> {
        let buf = self.inner.lock().expect("event log mutex poisoned");
        buf.iter().take(limit).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("event log mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Empty the buffer, leaving one entry that documents the clear.
    pub fn clear(&self) -> SyncEvent {
        {
            let mut buf = self.inner.lock().expect("event log mutex poisoned");
            buf.clear();
        }
        self.record("Event log cleared", Severity::Info)
    }
}
