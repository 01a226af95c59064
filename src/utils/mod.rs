// src/utils/mod.rs

//! Small text and URL helpers shared across adapters.

use url::Url;

/// Collapse runs of whitespace to single spaces and trim.
pub fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Lowercased, punctuation-free form used for fingerprints and name
/// similarity.
pub fn normalize_key(s: &str) -> String {
    let stripped: String = s
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    normalize_whitespace(&stripped)
}

/// Sailor-page slug: trimmed, lowercased, whitespace becomes hyphens.
pub fn sailor_slug(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
}

/// Resolve a potentially relative URL against a base URL.
pub fn resolve_url(base: &Url, href: &str) -> String {
    base.join(href)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| href.to_string())
}
