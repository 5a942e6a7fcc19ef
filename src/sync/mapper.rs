// src/sync/mapper.rs
//! Raw feed item + source descriptor -> canonical article record.

use anyhow::{bail, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use time::{format_description::well_known::Rfc2822, OffsetDateTime};

use crate::sync::normalize::{infer_locality, sanitize, summarize};
use crate::sync::registry::{Category, SourceDescriptor};
use crate::sync::types::RawItem;

/// Marks records created by this pipeline.
pub const PROVENANCE_TAG: &str = "rss-import";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArticleStatus {
    Published,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleRecord {
    pub title: String,
    pub content: String,
    pub summary: String,
    pub url: String, // natural key
    pub category: Category,
    pub partition: String,
    pub status: ArticleStatus,
    pub locality: Option<String>,
    pub image_url: Option<String>,
    pub tags: Vec<String>,
    /// Raw date string exactly as the feed delivered it.
    pub published_at: Option<String>,
    /// Best-effort parse of `published_at`; `None` when absent or unparseable.
    pub published_at_parsed: Option<DateTime<Utc>>,
    pub view_count: u64,
}

/// A record as returned by the store, with server-assigned fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredArticle {
    pub id: String,
    #[serde(flatten)]
    pub record: ArticleRecord,
    pub created_at: DateTime<Utc>,
    pub synced_at: DateTime<Utc>,
}

fn non_empty(s: &Option<String>) -> Option<&str> {
    s.as_deref().filter(|v| !v.is_empty())
}

/// Map one raw item. Fails only when the title is missing or blank.
pub fn map_item(item: &RawItem, source: &SourceDescriptor) -> Result<ArticleRecord> {
    let title = match item.title.as_deref().map(str::trim) {
        Some(t) if !t.is_empty() => t.to_string(),
        _ => bail!("raw item {} has no title", item.link),
    };

    let content = sanitize(non_empty(&item.body_html).or(non_empty(&item.summary_html)));
    let summary = summarize(non_empty(&item.summary_html).unwrap_or(content.as_str()));
    let image_url = non_empty(&item.thumbnail_url)
        .or(non_empty(&item.enclosure_url))
        .map(str::to_string);
    let locality = infer_locality(&content).map(str::to_string);

    Ok(ArticleRecord {
        title,
        content,
        summary,
        url: item.link.clone(),
        category: source.category,
        partition: source.partition.clone(),
        status: ArticleStatus::Published,
        locality,
        image_url,
        tags: vec![source.category.as_str().to_string(), PROVENANCE_TAG.to_string()],
        published_at: item.published_at.clone(),
        published_at_parsed: item.published_at.as_deref().and_then(parse_published),
        view_count: 0,
    })
}

/// RFC 2822, RFC 3339, or `YYYY-MM-DD HH:MM:SS` (taken as UTC).
pub fn parse_published(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = OffsetDateTime::parse(s, &Rfc2822) {
        return DateTime::from_timestamp(dt.unix_timestamp(), dt.nanosecond());
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|n| n.and_utc())
}
