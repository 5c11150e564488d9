//! Link list input: explicit arguments or a saved wishlist page.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{info, warn};

use crate::config::InputConfig;
use crate::error::{Error, Result};

#[allow(clippy::expect_used)]
static ANCHOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<a\b([^>]*)>").expect("anchor pattern compiles"));

#[allow(clippy::expect_used)]
static ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)([a-z_:][-a-z0-9_:.]*)\s*=\s*(?:"([^"]*)"|'([^']*)')"#)
        .expect("attribute pattern compiles")
});

/// Resolve the links for one run
///
/// Explicit `args` take precedence; the wishlist snapshot is only read when no
/// links were given. Duplicates are dropped, keeping the first occurrence.
/// An unreadable snapshot is a startup error.
pub async fn load_links(args: Vec<String>, config: &InputConfig) -> Result<Vec<String>> {
    if !args.is_empty() {
        info!(count = args.len(), "Using links from arguments");
        return Ok(dedup_links(args));
    }

    let html = tokio::fs::read_to_string(&config.wishlist_file)
        .await
        .map_err(|e| Error::Input {
            path: config.wishlist_file.clone(),
            reason: e.to_string(),
        })?;

    let links = parse_wishlist_links(&html, &config.link_class);
    if links.is_empty() {
        warn!(
            path = %config.wishlist_file.display(),
            class = %config.link_class,
            "Wishlist snapshot contains no album links"
        );
    } else {
        info!(
            path = %config.wishlist_file.display(),
            count = links.len(),
            "Loaded links from wishlist snapshot"
        );
    }
    Ok(links)
}

/// `href` of every `<a>` whose class list contains `class`, in document order
///
/// Entity-encoded hrefs (`&amp;`) are decoded. Anchors without an `href` are skipped.
pub fn parse_wishlist_links(html: &str, class: &str) -> Vec<String> {
    let links = ANCHOR_RE
        .captures_iter(html)
        .filter_map(|caps| {
            let attrs = caps.get(1)?.as_str();
            let mut has_class = false;
            let mut href = None;

            for attr in ATTR_RE.captures_iter(attrs) {
                let name = attr.get(1).map(|m| m.as_str().to_ascii_lowercase());
                let value = attr.get(2).or_else(|| attr.get(3)).map(|m| m.as_str());
                match (name.as_deref(), value) {
                    (Some("class"), Some(v)) => {
                        has_class = v.split_whitespace().any(|token| token == class);
                    }
                    (Some("href"), Some(v)) => href = Some(decode_entities(v.trim())),
                    _ => {}
                }
            }

            if has_class { href } else { None }
        })
        .filter(|href| !href.is_empty())
        .collect();

    dedup_links(links)
}

fn dedup_links(links: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    links
        .into_iter()
        .filter(|link| seen.insert(link.clone()))
        .collect()
}

fn decode_entities(value: &str) -> String {
    value
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}
