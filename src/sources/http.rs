use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use std::{path::PathBuf, time::Duration};
use tracing::{debug, info};

use super::{is_remote, CorsProxy, FeedSource};
use crate::{
    cache::BodyCache,
    config::Config,
    error::{FeedError, FeedResult},
};

const FEED_ACCEPT: &str = "application/xml, application/rss+xml, application/json, text/xml";

/// Cliente HTTP para feeds, con relay CORS opcional y caché de cuerpos.
///
/// Las ubicaciones que no son http(s) se leen del disco, relativas a
/// `base_dir` (el equivalente al `fetch('feed.json')` del navegador).
pub struct HttpSource {
    client: reqwest::Client,
    proxy: CorsProxy,
    local_hosts: Vec<String>,
    base_dir: PathBuf,
    cache: BodyCache,
}

impl HttpSource {
    pub fn new(
        timeout: Duration,
        proxy: CorsProxy,
        local_hosts: Vec<String>,
        cache: BodyCache,
    ) -> FeedResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(FEED_ACCEPT));

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .user_agent(concat!("bbs-player/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            proxy,
            local_hosts,
            base_dir: PathBuf::from("."),
            cache,
        })
    }

    pub fn from_config(config: &Config) -> FeedResult<Self> {
        let cache = BodyCache::new(Some(config.body_cache_ttl));
        Self::new(
            config.fetch_timeout,
            config.cors_proxy.clone(),
            config.local_hosts.clone(),
            cache,
        )
    }

    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.base_dir = base_dir.into();
        self
    }

    pub fn cache(&self) -> &BodyCache {
        &self.cache
    }

    /// URL final a la que se hace la petición.
    pub fn fetch_url(&self, url: &str) -> String {
        if is_remote(url, &self.local_hosts) && self.proxy.is_enabled() {
            debug!("Usando {} como proxy CORS", self.proxy);
            self.proxy.wrap(url)
        } else {
            url.to_string()
        }
    }

    async fn fetch_remote(&self, url: &str) -> FeedResult<String> {
        let fetch_url = self.fetch_url(url);
        info!("🌐 Fetching feed from: {}", fetch_url);

        let response = self.client.get(&fetch_url).send().await?;
        if !response.status().is_success() {
            return Err(FeedError::Http {
                status: response.status().to_string(),
            });
        }

        Ok(response.text().await?)
    }

    async fn fetch_local(&self, location: &str) -> FeedResult<String> {
        let path = self.base_dir.join(location.trim_start_matches("file://"));
        debug!("Leyendo feed local: {}", path.display());
        Ok(tokio::fs::read_to_string(&path).await?)
    }
}

#[async_trait]
impl FeedSource for HttpSource {
    async fn fetch_text(&self, url: &str) -> FeedResult<String> {
        let key = url.to_string();
        if let Some(body) = self.cache.get(&key) {
            debug!("Cache hit para {}", url);
            return Ok(body);
        }

        let body = if url.starts_with("http://") || url.starts_with("https://") {
            self.fetch_remote(url).await?
        } else {
            self.fetch_local(url).await?
        };

        self.cache.insert(key, body.clone());
        Ok(body)
    }
}
