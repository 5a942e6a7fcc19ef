// src/sync/providers/rss_xml.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::histogram;
use quick_xml::de::from_str;
use serde::Deserialize;
use std::time::Duration;

use crate::sync::types::{FeedFetcher, FetchResponse, RawItem};

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
    #[serde(rename = "content:encoded")]
    content_encoded: Option<String>,
    #[serde(rename = "media:thumbnail")]
    media_thumbnail: Option<UrlAttr>,
    #[serde(rename = "media:content")]
    media_content: Option<UrlAttr>,
    enclosure: Option<UrlAttr>,
}

#[derive(Debug, Deserialize)]
struct UrlAttr {
    #[serde(rename = "@url")]
    url: Option<String>,
}

/// RSS 2.0 fetcher: plain HTTP GET + quick-xml, or a fixed XML document.
pub struct RssXmlFetcher {
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http { client: reqwest::Client },
}

impl RssXmlFetcher {
    pub fn from_fixture(s: &str) -> Self {
        Self {
            mode: Mode::Fixture(s.to_string()),
        }
    }

    pub fn http(timeout: Option<Duration>) -> Result<Self> {
        let mut builder = reqwest::Client::builder().user_agent("guide-feed-sync/0.1");
        if let Some(t) = timeout {
            builder = builder.timeout(t);
        }
        let client = builder.build().context("building rss http client")?;
        Ok(Self {
            mode: Mode::Http { client },
        })
    }

    /// Parse an RSS document into raw items. Items without a link are dropped;
    /// they have no natural key.
    pub fn parse_items(xml: &str, max_items: usize) -> Result<Vec<RawItem>> {
        let t0 = std::time::Instant::now();
        let xml_clean = scrub_html_entities_for_xml(xml);
        let rss: Rss = from_str(&xml_clean).context("parsing rss xml")?;

        let out: Vec<RawItem> = rss
            .channel
            .item
            .into_iter()
            .filter_map(|it| {
                let link = it.link.map(|l| l.trim().to_string()).filter(|l| !l.is_empty())?;
                Some(RawItem {
                    title: it.title,
                    link,
                    published_at: it.pub_date,
                    body_html: it.content_encoded,
                    summary_html: it.description,
                    thumbnail_url: it
                        .media_thumbnail
                        .and_then(|m| m.url)
                        .or(it.media_content.and_then(|m| m.url)),
                    enclosure_url: it.enclosure.and_then(|e| e.url),
                })
            })
            .take(max_items)
            .collect();

        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("sync_parse_ms").record(ms);
        Ok(out)
    }
}

#[async_trait]
impl FeedFetcher for RssXmlFetcher {
    async fn fetch(&self, feed_url: &str, max_items: usize) -> Result<FetchResponse> {
        match &self.mode {
            Mode::Fixture(s) => Ok(FetchResponse::ok(Self::parse_items(s, max_items)?)),
            Mode::Http { client } => {
                let resp = client
                    .get(feed_url)
                    .send()
                    .await
                    .with_context(|| format!("rss http get {feed_url}"))?;
                let status = resp.status();
                if !status.is_success() {
                    return Ok(FetchResponse::failed(
                        format!("http {}", status.as_u16()),
                        format!("{feed_url} answered {status}"),
                    ));
                }
                let body = resp.text().await.context("rss http .text()")?;
                Ok(FetchResponse::ok(Self::parse_items(&body, max_items)?))
            }
        }
    }

    fn name(&self) -> &'static str {
        "rss-xml"
    }
}

fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
        .replace("&hellip;", "...")
}
