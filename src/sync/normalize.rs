// src/sync/normalize.rs
//! Content normalization: markup scrubbing, summary derivation and locality
//! tagging. Everything here is pure and deterministic.

use once_cell::sync::OnceCell;
use regex::Regex;

pub const CONTENT_PLACEHOLDER: &str = "Contenu à venir";
pub const SUMMARY_PLACEHOLDER: &str = "Résumé à venir";
pub const SUMMARY_MAX_CHARS: usize = 200;
/// A whitespace cut is only taken when it lands past this position.
pub const SUMMARY_MIN_WORD_CUT: usize = 150;
pub const ELLIPSIS: &str = "...";

/// Locality names, checked in declaration order. First hit wins.
pub const GAZETTEER: &[&str] = &[
    "Nice",
    "Cannes",
    "Antibes",
    "Monaco",
    "Menton",
    "Grasse",
    "Saint-Tropez",
    "Juan-les-Pins",
    "Villefranche-sur-Mer",
    "Beaulieu-sur-Mer",
    "Cagnes-sur-Mer",
    "Saint-Jean-Cap-Ferrat",
    "Saint-Paul-de-Vence",
    "Vence",
    "Èze",
    "Mandelieu",
    "Fréjus",
    "Saint-Raphaël",
    "Valbonne",
    "Mougins",
];

fn re_script() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>").unwrap())
}

fn re_style() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"(?is)<style\b[^>]*>.*?</style\s*>").unwrap())
}

fn re_comment() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"(?s)<!--.*?-->").unwrap())
}

fn re_tags() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"(?is)</?[^>]+>").unwrap())
}

/// Remove script, style and comment blocks; keep the rest of the markup.
pub fn sanitize(raw_html: Option<&str>) -> String {
    let Some(raw) = raw_html.filter(|s| !s.trim().is_empty()) else {
        return CONTENT_PLACEHOLDER.to_string();
    };

    let out = re_script().replace_all(raw, "");
    let out = re_style().replace_all(&out, "");
    let out = re_comment().replace_all(&out, "");
    out.trim().to_string()
}

/// Drop every markup tag and trim.
pub fn strip_tags(s: &str) -> String {
    re_tags().replace_all(s, "").trim().to_string()
}

/// Plain-text summary of at most 200 chars (plus ellipsis), cut on a word
/// boundary when one exists past char 150.
pub fn summarize(content: &str) -> String {
    let text = strip_tags(content);
    if text.is_empty() {
        return SUMMARY_PLACEHOLDER.to_string();
    }

    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= SUMMARY_MAX_CHARS {
        return text;
    }

    let head = &chars[..SUMMARY_MAX_CHARS];
    let end = match head.iter().rposition(|c| c.is_whitespace()) {
        Some(pos) if pos > SUMMARY_MIN_WORD_CUT => pos,
        _ => SUMMARY_MAX_CHARS,
    };

    let mut out: String = head[..end].iter().collect();
    out.push_str(ELLIPSIS);
    out
}

/// First gazetteer entry occurring anywhere in the text.
///
/// Plain case-sensitive substring search without word boundaries, so "Nice"
/// also matches inside "Nicest". Known imprecision.
pub fn infer_locality(content: &str) -> Option<&'static str> {
    let text = strip_tags(content);
    let text = html_escape::decode_html_entities(&text);
    GAZETTEER.iter().copied().find(|name| text.contains(name))
}
