//! # Cache Module
//!
//! In-memory caching for fetched feed documents.
//!
//! Adding a feed validates the URL first (content sniffing) and then parses
//! it, which would otherwise hit the network twice. Response bodies are kept
//! for a short TTL so the second request is served from memory.
//!
//! Long-lived freshness of custom feeds is handled separately by the feed
//! library through each feed's `lastUpdated` stamp (one hour by default).
//!
//! ## Configuration
//!
//! ```env
//! BODY_CACHE_TTL=5m           # Lifetime of a cached response body
//! ```

pub mod ttl_cache;

use tracing::info;
use ttl_cache::TtlCache;

/// Cuerpos de respuesta indexados por URL original (sin proxy).
pub type BodyCache = TtlCache<String, String>;

impl BodyCache {
    /// Elimina entradas expiradas; la sesión interactiva lo llama periódicamente.
    pub fn cleanup_old_entries(&self) -> usize {
        let removed = self.cleanup_expired();
        if removed > 0 {
            info!("🧹 Cache cleanup: removed {} expired entries", removed);
        }
        removed
    }
}
