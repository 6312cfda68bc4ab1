pub mod discovery;
pub mod http;
pub mod proxy;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::{
    error::FeedResult,
    feed::{looks_like_feed, parse_body, Feed},
};

pub use discovery::{discover_feeds, DiscoveredFeed};
pub use http::HttpSource;
pub use proxy::{is_remote, CorsProxy};

/// Origen de documentos de feed (HTTP, disco, mocks en tests).
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Descarga el documento tal cual, sin interpretar.
    async fn fetch_text(&self, url: &str) -> FeedResult<String>;
}

/// Descarga y normaliza un feed.
pub async fn parse_feed(source: &dyn FeedSource, url: &str) -> FeedResult<Feed> {
    info!("📡 Descargando feed: {}", url);
    let text = source.fetch_text(url).await?;
    let feed = parse_body(&text, url)?;
    info!("✅ Feed '{}' con {} pistas", feed.title, feed.tracks.len());
    Ok(feed)
}

/// Heurística para saber si una URL apunta a un feed.
///
/// Las extensiones conocidas se aceptan sin red; el resto se descarga y se
/// busca una firma RSS/Atom/JSON. Cualquier fallo de red cuenta como `false`.
pub async fn detect_feed_type(source: &dyn FeedSource, url: &str) -> bool {
    debug!("Detectando tipo de feed para: {}", url);

    if url.ends_with(".rss") || url.ends_with(".xml") || url.ends_with(".json") {
        debug!("URL con extensión de feed válida");
        return true;
    }

    match source.fetch_text(url).await {
        Ok(text) => {
            let sample: String = text.chars().take(100).collect();
            debug!("Muestra del contenido: {}...", sample);
            looks_like_feed(&text)
        }
        Err(e) => {
            warn!("⚠️ Error obteniendo muestra de {}: {}", url, e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FeedError;
    use mockall::predicate::eq;

    #[tokio::test]
    async fn test_detect_by_extension_skips_network() {
        let mut source = MockFeedSource::new();
        source.expect_fetch_text().never();

        assert!(detect_feed_type(&source, "https://example.com/podcast.rss").await);
        assert!(detect_feed_type(&source, "https://example.com/feed.json").await);
    }

    #[tokio::test]
    async fn test_detect_by_content() {
        let mut source = MockFeedSource::new();
        source
            .expect_fetch_text()
            .with(eq("https://example.com/podcast"))
            .returning(|_| Ok("<?xml version=\"1.0\"?><rss><channel></channel></rss>".to_string()));
        source
            .expect_fetch_text()
            .with(eq("https://example.com/blog"))
            .returning(|_| Ok("<html><body>blog</body></html>".to_string()));
        source
            .expect_fetch_text()
            .with(eq("https://down.example.com/"))
            .returning(|_| Err(FeedError::Timeout));

        assert!(detect_feed_type(&source, "https://example.com/podcast").await);
        assert!(!detect_feed_type(&source, "https://example.com/blog").await);
        assert!(!detect_feed_type(&source, "https://down.example.com/").await);
    }

    #[tokio::test]
    async fn test_parse_feed_propagates_fetch_errors() {
        let mut source = MockFeedSource::new();
        source
            .expect_fetch_text()
            .returning(|_| Err(FeedError::Http { status: "404 Not Found".to_string() }));

        let err = parse_feed(&source, "https://example.com/rss").await.unwrap_err();
        assert_eq!(err.to_string(), "Failed to fetch feed: 404 Not Found");
    }
}
