// src/sync/registry.rs
//! Static, ordered list of feed descriptors.
//!
//! Loaded once at startup from TOML or JSON, or taken from the built-in seed.
//! Lookup order for the file:
//! 1) $SYNC_REGISTRY_PATH
//! 2) config/sources.toml
//! 3) config/sources.json
//! 4) `SourceRegistry::default_seed()`

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

pub const ENV_REGISTRY_PATH: &str = "SYNC_REGISTRY_PATH";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Hotel,
    Restaurant,
    Activity,
    Event,
    News,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Hotel => "hotel",
            Category::Restaurant => "restaurant",
            Category::Activity => "activity",
            Category::Event => "event",
            Category::News => "news",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDescriptor {
    pub feed_url: String,
    pub category: Category,
    /// Downstream section the content belongs to, e.g. "guide".
    pub partition: String,
}

impl SourceDescriptor {
    pub fn new(feed_url: &str, category: Category, partition: &str) -> Self {
        Self {
            feed_url: feed_url.to_string(),
            category,
            partition: partition.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceRegistry {
    sources: Vec<SourceDescriptor>,
}

impl SourceRegistry {
    /// Build a registry, trimming fields and rejecting duplicate feed URLs.
    pub fn new(sources: Vec<SourceDescriptor>) -> Result<Self> {
        let mut seen = HashSet::new();
        let mut out = Vec::with_capacity(sources.len());
        for mut s in sources {
            s.feed_url = s.feed_url.trim().to_string();
            s.partition = s.partition.trim().to_string();
            if s.feed_url.is_empty() {
                bail!("source with empty feed_url");
            }
            if !seen.insert(s.feed_url.clone()) {
                bail!("duplicate feed_url in registry: {}", s.feed_url);
            }
            out.push(s);
        }
        Ok(Self { sources: out })
    }

    pub fn iter(&self) -> impl Iterator<Item = &SourceDescriptor> {
        self.sources.iter()
    }

    pub fn sources(&self) -> &[SourceDescriptor] {
        &self.sources
    }

    pub fn find(&self, feed_url: &str) -> Option<&SourceDescriptor> {
        let key = feed_url.trim();
        self.sources.iter().find(|s| s.feed_url == key)
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Built-in registry used when no file is configured.
    pub fn default_seed() -> Self {
        let seed = [
            (
                "https://news.google.com/rss/search?q=h%C3%B4tel+Nice+C%C3%B4te+d%27Azur&hl=fr&gl=FR&ceid=FR:fr",
                Category::Hotel,
                "guide",
            ),
            (
                "https://news.google.com/rss/search?q=restaurant+Nice+C%C3%B4te+d%27Azur&hl=fr&gl=FR&ceid=FR:fr",
                Category::Restaurant,
                "guide",
            ),
            (
                "https://news.google.com/rss/search?q=sortir+Nice+%C3%A9v%C3%A9nement&hl=fr&gl=FR&ceid=FR:fr",
                Category::Event,
                "agenda",
            ),
        ];
        Self {
            sources: seed
                .iter()
                .map(|(url, cat, part)| SourceDescriptor::new(url, *cat, part))
                .collect(),
        }
    }

    /// Load from an explicit path. Supports TOML or JSON formats.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading source registry from {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        parse_registry(&content, ext.as_str())
            .with_context(|| format!("parsing source registry {}", path.display()))
    }

    /// Load using env var + fallbacks, see module docs.
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_REGISTRY_PATH) {
            let pb = PathBuf::from(p);
            if pb.exists() {
                return Self::load_from(&pb);
            }
            return Err(anyhow!("{ENV_REGISTRY_PATH} points to non-existent path"));
        }
        let toml_p = PathBuf::from("config/sources.toml");
        if toml_p.exists() {
            return Self::load_from(&toml_p);
        }
        let json_p = PathBuf::from("config/sources.json");
        if json_p.exists() {
            return Self::load_from(&json_p);
        }
        Ok(Self::default_seed())
    }
}

#[derive(Deserialize)]
struct RegistryFile {
    sources: Vec<SourceDescriptor>,
}

fn parse_registry(s: &str, hint_ext: &str) -> Result<SourceRegistry> {
    if hint_ext == "toml" {
        return parse_toml(s);
    }
    if hint_ext == "json" {
        return parse_json(s);
    }
    parse_json(s).or_else(|_| parse_toml(s))
}

fn parse_toml(s: &str) -> Result<SourceRegistry> {
    let v: RegistryFile = toml::from_str(s)?;
    SourceRegistry::new(v.sources)
}

fn parse_json(s: &str) -> Result<SourceRegistry> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum JsonRegistry {
        List(Vec<SourceDescriptor>),
        Wrapped(RegistryFile),
    }
    let sources = match serde_json::from_str::<JsonRegistry>(s)? {
        JsonRegistry::List(v) => v,
        JsonRegistry::Wrapped(w) => w.sources,
    };
    SourceRegistry::new(sources)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toml_and_json_formats_parse_in_order() {
        let toml = r#"
[[sources]]
feed_url = " https://a.test/feed "
category = "hotel"
partition = "guide"

[[sources]]
feed_url = "https://b.test/feed"
category = "restaurant"
partition = "guide"
"#;
        let reg = parse_toml(toml).unwrap();
        assert_eq!(reg.len(), 2);
        assert_eq!(reg.sources()[0].feed_url, "https://a.test/feed");
        assert_eq!(reg.sources()[1].category, Category::Restaurant);

        let json = r#"[{"feed_url":"https://c.test/rss","category":"event","partition":"agenda"}]"#;
        let reg = parse_json(json).unwrap();
        assert_eq!(reg.sources()[0].partition, "agenda");

        let wrapped = r#"{"sources":[{"feed_url":"https://d.test","category":"news","partition":"mag"}]}"#;
        assert_eq!(parse_registry(wrapped, "").unwrap().len(), 1);
    }

    #[test]
    fn duplicate_feed_url_is_rejected() {
        let err = SourceRegistry::new(vec![
            SourceDescriptor::new("https://a.test/feed", Category::Hotel, "guide"),
            SourceDescriptor::new("https://a.test/feed ", Category::Restaurant, "guide"),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("duplicate feed_url"));
    }

    #[test]
    fn unknown_category_fails_to_parse() {
        let json = r#"[{"feed_url":"https://c.test/rss","category":"spa","partition":"x"}]"#;
        assert!(parse_json(json).is_err());
    }

    #[test]
    fn seed_is_non_empty_and_unique() {
        let seed = SourceRegistry::default_seed();
        assert!(!seed.is_empty());
        assert!(SourceRegistry::new(seed.sources().to_vec()).is_ok());
    }
}
