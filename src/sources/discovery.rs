use regex::Regex;
use serde::Serialize;
use std::{collections::HashMap, sync::OnceLock};
use tracing::{info, warn};
use url::Url;

use super::FeedSource;

const FEED_TYPES: [&str; 2] = ["application/rss+xml", "application/atom+xml"];

/// Feed anunciado por una página HTML mediante `<link rel="alternate">`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiscoveredFeed {
    pub url: String,
    pub title: String,
}

/// Busca feeds RSS/Atom anunciados en una página web.
///
/// Los errores de red o de parseo devuelven una lista vacía.
pub async fn discover_feeds(source: &dyn FeedSource, page_url: &str) -> Vec<DiscoveredFeed> {
    match source.fetch_text(page_url).await {
        Ok(html) => {
            let feeds = extract_feed_links(&html, page_url);
            info!("🔎 {} feeds descubiertos en {}", feeds.len(), page_url);
            feeds
        }
        Err(e) => {
            warn!("Error discovering feeds: {}", e);
            Vec::new()
        }
    }
}

/// Extrae los `<link>` alternativos con tipo RSS/Atom, resolviendo URLs relativas.
pub fn extract_feed_links(html: &str, page_url: &str) -> Vec<DiscoveredFeed> {
    static LINK_TAG: OnceLock<Regex> = OnceLock::new();
    let link_tag =
        LINK_TAG.get_or_init(|| Regex::new(r"(?is)<link\b([^>]*)>").expect("static regex"));

    let base = Url::parse(page_url).ok();

    link_tag
        .captures_iter(html)
        .filter_map(|cap| {
            let attrs = parse_attributes(cap.get(1)?.as_str());
            let rel = attrs.get("rel")?;
            let kind = attrs.get("type")?;
            let is_alternate = rel
                .split_whitespace()
                .any(|r| r.eq_ignore_ascii_case("alternate"));
            if !is_alternate || !FEED_TYPES.iter().any(|t| kind.eq_ignore_ascii_case(t)) {
                return None;
            }

            let href = attrs.get("href").filter(|h| !h.is_empty())?;
            let url = match &base {
                Some(base) => base.join(href).ok()?.to_string(),
                None => Url::parse(href).ok()?.to_string(),
            };

            Some(DiscoveredFeed {
                url,
                title: attrs
                    .get("title")
                    .filter(|t| !t.is_empty())
                    .cloned()
                    .unwrap_or_else(|| "Untitled Feed".to_string()),
            })
        })
        .collect()
}

fn parse_attributes(raw: &str) -> HashMap<String, String> {
    static ATTR: OnceLock<Regex> = OnceLock::new();
    let attr = ATTR.get_or_init(|| {
        Regex::new(r#"([A-Za-z_:][-A-Za-z0-9_:.]*)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#)
            .expect("static regex")
    });

    attr.captures_iter(raw)
        .filter_map(|cap| {
            let name = cap.get(1)?.as_str().to_lowercase();
            let value = cap.get(2).or(cap.get(3)).or(cap.get(4))?.as_str();
            Some((name, value.trim().to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::FeedError, sources::MockFeedSource};
    use pretty_assertions::assert_eq;

    const PAGE: &str = r#"<!doctype html>
<html><head>
  <link rel="stylesheet" href="/style.css">
  <link rel="alternate" type="application/rss+xml" title="Main feed" href="/feed.xml">
  <LINK REL='alternate' TYPE='application/atom+xml' HREF='https://cdn.example.com/atom'>
  <link rel="alternate" type="text/html" href="/es/">
</head></html>"#;

    #[test]
    fn test_extract_feed_links() {
        let feeds = extract_feed_links(PAGE, "https://example.com/blog/");
        assert_eq!(
            feeds,
            vec![
                DiscoveredFeed {
                    url: "https://example.com/feed.xml".to_string(),
                    title: "Main feed".to_string(),
                },
                DiscoveredFeed {
                    url: "https://cdn.example.com/atom".to_string(),
                    title: "Untitled Feed".to_string(),
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_discover_failure_is_empty() {
        let mut source = MockFeedSource::new();
        source.expect_fetch_text().returning(|_| Err(FeedError::Timeout));
        assert!(discover_feeds(&source, "https://example.com").await.is_empty());
    }
}
