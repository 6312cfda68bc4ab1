//! # Feed Library
//!
//! Owns the two feed collections the player shows:
//!
//! - **Default feeds**: loaded once from the defaults file (`feed.json`).
//! - **Custom feeds**: added by the user, persisted through [`JsonStorage`]
//!   and refreshable once their cache window has passed.
//!
//! The merged list is always `defaults ++ customs`.

use chrono::Utc;
use futures::future::join_all;
use serde_json::Value;
use std::{sync::Arc, time::Duration};
use tracing::{error, info, warn};

use crate::{
    error::{FeedError, FeedResult},
    feed::{json::feed_from_value, Feed},
    sources::{self, DiscoveredFeed, FeedSource},
    storage::JsonStorage,
};

/// Feed de ejemplo incluido; se agrega sin validación previa.
pub const SAMPLE_FEED: &str = "palm-springs-feed.json";

/// Resultado de refrescar un feed custom.
#[derive(Debug)]
pub enum RefreshOutcome {
    /// Dentro de la ventana de caché, no se descargó nada.
    Fresh,
    Updated,
    Failed(FeedError),
}

pub struct FeedLibrary {
    source: Arc<dyn FeedSource>,
    storage: JsonStorage,
    defaults_location: String,
    cache_time: Duration,
    default_feeds: Vec<Feed>,
    custom_feeds: Vec<Feed>,
    feeds: Vec<Feed>,
}

impl FeedLibrary {
    pub fn new(
        source: Arc<dyn FeedSource>,
        storage: JsonStorage,
        defaults_location: impl Into<String>,
    ) -> Self {
        Self {
            source,
            storage,
            defaults_location: defaults_location.into(),
            cache_time: Duration::from_secs(60 * 60),
            default_feeds: Vec::new(),
            custom_feeds: Vec::new(),
            feeds: Vec::new(),
        }
    }

    pub fn with_cache_time(mut self, cache_time: Duration) -> Self {
        self.cache_time = cache_time;
        self
    }

    /// Carga feeds por defecto y custom, y arma la lista combinada.
    pub async fn initialize(&mut self) -> anyhow::Result<()> {
        self.load_default_feeds().await;
        self.load_custom_feeds().await?;
        self.update_feeds_list();
        info!(
            "📚 Biblioteca lista: {} por defecto, {} custom",
            self.default_feeds.len(),
            self.custom_feeds.len()
        );
        Ok(())
    }

    /// Acepta `{ "feeds": [...] }`, un array de feeds o un feed suelto.
    /// Cualquier error deja la lista por defecto vacía.
    pub async fn load_default_feeds(&mut self) {
        self.default_feeds = match self.source.fetch_text(&self.defaults_location).await {
            Ok(text) => match serde_json::from_str::<Value>(&text) {
                Ok(data) => default_feeds_from_value(&data),
                Err(e) => {
                    error!("Error loading default feeds: {}", e);
                    Vec::new()
                }
            },
            Err(e) => {
                error!("Error loading default feeds: {}", e);
                Vec::new()
            }
        };
    }

    pub async fn load_custom_feeds(&mut self) -> anyhow::Result<()> {
        self.custom_feeds = self.storage.load_custom_feeds().await?;
        Ok(())
    }

    fn update_feeds_list(&mut self) {
        self.feeds = self
            .default_feeds
            .iter()
            .chain(self.custom_feeds.iter())
            .cloned()
            .collect();
    }

    pub fn all_feeds(&self) -> &[Feed] {
        &self.feeds
    }

    pub fn custom_feeds(&self) -> &[Feed] {
        &self.custom_feeds
    }

    pub fn feed_by_id(&self, id: &str) -> Option<&Feed> {
        self.feeds.iter().find(|feed| feed.id == id)
    }

    /// Agrega un feed custom desde una URL.
    pub async fn add_feed(&mut self, url: &str) -> FeedResult<Feed> {
        let url = url.trim();
        if url.is_empty() {
            return Err(FeedError::InvalidUrl);
        }

        if self
            .custom_feeds
            .iter()
            .any(|feed| feed.url.as_deref() == Some(url))
        {
            return Err(FeedError::AlreadyExists);
        }

        if url == SAMPLE_FEED {
            info!("Using sample feed - skipping validation");
        } else if !sources::detect_feed_type(self.source.as_ref(), url).await {
            return Err(FeedError::NotAFeed);
        }

        let feed = sources::parse_feed(self.source.as_ref(), url)
            .await?
            .stamp(url, Utc::now());

        self.custom_feeds.push(feed.clone());
        self.save_custom_feeds().await;
        self.update_feeds_list();

        info!("➕ Feed agregado: {} ({})", feed.title, feed.id);
        Ok(feed)
    }

    /// Solo los feeds custom se pueden eliminar.
    pub async fn remove_feed(&mut self, id: &str) -> bool {
        let Some(index) = self.custom_feeds.iter().position(|feed| feed.id == id) else {
            return false;
        };

        let removed = self.custom_feeds.remove(index);
        self.save_custom_feeds().await;
        self.update_feeds_list();

        info!("🗑️ Feed eliminado: {}", removed.title);
        true
    }

    /// Refresca un feed custom si su ventana de caché expiró.
    ///
    /// El feed refrescado conserva su ID para que el estado guardado del
    /// reproductor siga apuntando a él.
    pub async fn refresh_feed(&mut self, id: &str) -> FeedResult<Feed> {
        let feed = self
            .feeds
            .iter()
            .find(|feed| feed.id == id)
            .filter(|feed| feed.url.is_some())
            .cloned()
            .ok_or(FeedError::NotFound)?;

        let index = self
            .custom_feeds
            .iter()
            .position(|f| f.id == id)
            .ok_or(FeedError::NotRefreshable)?;

        if self.is_fresh(&feed) {
            return Ok(feed);
        }

        let url = feed.url.clone().unwrap_or_default();
        let updated = fetch_update(self.source.as_ref(), &feed, &url).await?;

        self.custom_feeds[index] = updated.clone();
        self.save_custom_feeds().await;
        self.update_feeds_list();

        info!("🔄 Feed refrescado: {}", updated.title);
        Ok(updated)
    }

    /// Refresca en paralelo todos los feeds custom vencidos.
    pub async fn refresh_all(&mut self) -> Vec<(String, RefreshOutcome)> {
        let stale: Vec<Feed> = self
            .custom_feeds
            .iter()
            .filter(|feed| !self.is_fresh(feed))
            .cloned()
            .collect();

        let source = self.source.as_ref();
        let results = join_all(stale.iter().map(|feed| async move {
            let url = feed.url.clone().unwrap_or_default();
            (feed.id.clone(), fetch_update(source, feed, &url).await)
        }))
        .await;

        let mut outcomes: Vec<(String, RefreshOutcome)> = self
            .custom_feeds
            .iter()
            .filter(|feed| !stale.iter().any(|s| s.id == feed.id))
            .map(|feed| (feed.id.clone(), RefreshOutcome::Fresh))
            .collect();

        let mut changed = false;
        for (id, result) in results {
            match result {
                Ok(updated) => {
                    if let Some(slot) = self.custom_feeds.iter_mut().find(|f| f.id == id) {
                        *slot = updated;
                        changed = true;
                    }
                    outcomes.push((id, RefreshOutcome::Updated));
                }
                Err(e) => {
                    warn!("⚠️ No se pudo refrescar {}: {}", id, e);
                    outcomes.push((id, RefreshOutcome::Failed(e)));
                }
            }
        }

        if changed {
            self.save_custom_feeds().await;
            self.update_feeds_list();
        }

        outcomes
    }

    pub async fn clear_custom_feeds(&mut self) {
        self.custom_feeds.clear();
        self.save_custom_feeds().await;
        self.update_feeds_list();
    }

    pub async fn discover_feeds(&self, url: &str) -> Vec<DiscoveredFeed> {
        sources::discover_feeds(self.source.as_ref(), url).await
    }

    pub fn source(&self) -> &dyn FeedSource {
        self.source.as_ref()
    }

    fn is_fresh(&self, feed: &Feed) -> bool {
        let Some(last_updated) = feed.last_updated else {
            return false;
        };
        match (Utc::now() - last_updated).to_std() {
            Ok(age) => age < self.cache_time,
            // stamp en el futuro (reloj ajustado): se considera fresco
            Err(_) => true,
        }
    }

    async fn save_custom_feeds(&self) {
        if let Err(e) = self.storage.save_custom_feeds(&self.custom_feeds).await {
            error!("Error saving custom feeds: {}", e);
        }
    }
}

async fn fetch_update(source: &dyn FeedSource, feed: &Feed, url: &str) -> FeedResult<Feed> {
    let mut updated = sources::parse_feed(source, url).await?.stamp(url, Utc::now());
    updated.id = feed.id.clone();
    Ok(updated)
}

fn default_feeds_from_value(data: &Value) -> Vec<Feed> {
    let items: Vec<&Value> = match data {
        Value::Object(map) => match map.get("feeds") {
            Some(Value::Array(feeds)) => feeds.iter().collect(),
            _ => vec![data],
        },
        Value::Array(feeds) => feeds.iter().collect(),
        _ => Vec::new(),
    };

    items
        .into_iter()
        .filter(|item| item.is_object())
        .map(|item| feed_from_value(item, None))
        .collect()
}
