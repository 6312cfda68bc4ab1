//! # Feed Module
//!
//! Normalized feed/track schema consumed by the player, plus the parsers
//! that turn remote documents into it.
//!
//! Two input shapes are supported:
//!
//! - **JSON**: the player's own format, either a single feed object or a
//!   `{ "feeds": [...] }` wrapper (legacy default files).
//! - **XML**: RSS 2.0 podcast feeds (with iTunes/Media RSS extensions) and
//!   Atom, parsed through `feed-rs`.
//!
//! Every missing field gets a fallback default, so the player never has to
//! deal with partial records.
//!
//! ## Example
//!
//! ```rust
//! use bbs_player::feed::parse_body;
//!
//! let json = r#"{"title": "Radio BBS", "tracks": [{"title": "Intro"}]}"#;
//! let feed = parse_body(json, "https://example.com/feed.json").unwrap();
//! assert_eq!(feed.title, "Radio BBS");
//! assert_eq!(feed.tracks[0].title, "Intro");
//! ```

pub mod json;
pub mod text;
pub mod xml;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::FeedResult;

pub use json::parse_json;
pub use xml::parse_xml;

/// Un episodio/pista reproducible dentro de un feed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Track {
    pub id: String,
    pub title: String,
    pub description: String,
    pub audio_url: String,
    pub album_art: String,
    pub pub_date: String,
    pub duration: String,
    pub artist: String,
}

/// Colección de pistas con metadata.
///
/// `url` y `last_updated` solo existen en feeds custom (agregados por el
/// usuario); los feeds por defecto no se pueden refrescar.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Feed {
    pub id: String,
    pub title: String,
    pub description: String,
    pub link: String,
    pub image: String,
    pub tracks: Vec<Track>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
}

impl Feed {
    pub fn is_custom(&self) -> bool {
        self.url.is_some()
    }

    pub fn find_track(&self, id: &str) -> Option<&Track> {
        self.tracks.iter().find(|track| track.id == id)
    }

    /// Marca el feed como custom con su URL de origen y la hora de carga.
    pub fn stamp(mut self, url: &str, now: DateTime<Utc>) -> Self {
        self.url = Some(url.to_string());
        self.last_updated = Some(now);
        self
    }
}

/// Detecta JSON vs XML y delega al parser correspondiente.
pub fn parse_body(text: &str, url: &str) -> FeedResult<Feed> {
    if text.trim_start().starts_with('{') {
        parse_json(text, url)
    } else {
        parse_xml(text, url)
    }
}

/// Firma rápida para saber si un documento parece un feed.
pub fn looks_like_feed(text: &str) -> bool {
    text.contains("<rss")
        || text.contains("<feed")
        || text.contains("<channel")
        || text.trim_start().starts_with('{')
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_body_dispatches_on_first_char() {
        let feed = parse_body("  {\"title\": \"Json\"}", "local.json").unwrap();
        assert_eq!(feed.title, "Json");

        let rss = r#"<?xml version="1.0"?><rss version="2.0"><channel><title>Xml</title></channel></rss>"#;
        let feed = parse_body(rss, "https://example.com/rss").unwrap();
        assert_eq!(feed.title, "Xml");
    }

    #[test]
    fn test_find_track_by_id() {
        let feed = Feed {
            tracks: vec![
                Track {
                    id: "a".to_string(),
                    title: "Alpha".to_string(),
                    ..Default::default()
                },
                Track {
                    id: "b".to_string(),
                    title: "Beta".to_string(),
                    ..Default::default()
                },
            ],
            ..Default::default()
        };

        assert_eq!(feed.find_track("b").map(|t| t.title.as_str()), Some("Beta"));
        assert!(feed.find_track("z").is_none());
    }

    #[test]
    fn test_looks_like_feed() {
        assert!(looks_like_feed("<?xml?><rss version=\"2.0\">"));
        assert!(looks_like_feed("<feed xmlns=\"http://www.w3.org/2005/Atom\">"));
        assert!(looks_like_feed("\n {\"feeds\": []}"));
        assert!(!looks_like_feed("<!doctype html><html></html>"));
    }

    #[test]
    fn test_custom_feed_serializes_camel_case() {
        let feed = Feed {
            id: "f1".to_string(),
            tracks: vec![Track {
                audio_url: "https://cdn.example.com/a.mp3".to_string(),
                ..Default::default()
            }],
            ..Default::default()
        }
        .stamp("https://example.com/rss", Utc::now());

        let value = serde_json::to_value(&feed).unwrap();
        assert_eq!(value["url"], "https://example.com/rss");
        assert!(value.get("lastUpdated").is_some());
        assert_eq!(value["tracks"][0]["audioUrl"], "https://cdn.example.com/a.mp3");
        assert!(feed.is_custom());
    }

    #[test]
    fn test_default_feed_omits_custom_fields() {
        let value = serde_json::to_value(Feed::default()).unwrap();
        assert!(value.get("url").is_none());
        assert!(value.get("lastUpdated").is_none());
    }
}
