// src/sync/providers/mod.rs
pub mod rss2json;
pub mod rss_xml;
