use chrono::Utc;
use feed_rs::model::{Entry, Feed as RawFeed};
use regex::Regex;
use std::{sync::OnceLock, time::Duration};
use tracing::error;

use super::{
    text::{clean_description, generated_track_id, slugify},
    Feed, Track,
};
use crate::error::{FeedError, FeedResult};

/// Parsea RSS 2.0 (con extensiones iTunes/Media RSS) o Atom.
pub fn parse_xml(text: &str, url: &str) -> FeedResult<Feed> {
    // feed-rs acepta un <rss> sin <channel> como feed vacío
    if text.contains("<rss") && !text.contains("<channel") {
        error!("Error parsing XML feed: no channel element");
        return Err(FeedError::NoChannel);
    }

    let raw = feed_rs::parser::Builder::new()
        .base_uri(Some(url))
        .build()
        .parse(text.as_bytes())
        .map_err(|e| {
            error!("Error parsing XML feed: {}", e);
            FeedError::InvalidXml(e.to_string())
        })?;

    Ok(normalize(raw, url, itunes_authors(text)))
}

/// `itunes:author` de cada `<item>`, en orden de documento.
///
/// feed-rs no expone esta etiqueta, así que se extrae del texto crudo.
fn itunes_authors(text: &str) -> Vec<Option<String>> {
    static ITEM: OnceLock<Regex> = OnceLock::new();
    static AUTHOR: OnceLock<Regex> = OnceLock::new();

    let item = ITEM.get_or_init(|| Regex::new(r"(?is)<item\b.*?</item>").expect("static regex"));
    let author = AUTHOR.get_or_init(|| {
        Regex::new(r"(?is)<itunes:author\b[^>]*>\s*(?:<!\[CDATA\[)?(.*?)(?:\]\]>)?\s*</itunes:author>")
            .expect("static regex")
    });

    item.find_iter(text)
        .map(|m| {
            author
                .captures(m.as_str())
                .map(|c| c[1].trim().to_string())
                .filter(|name| !name.is_empty())
        })
        .collect()
}

fn normalize(raw: RawFeed, url: &str, itunes_authors: Vec<Option<String>>) -> Feed {
    let title = raw
        .title
        .map(|t| t.content.trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| "Untitled Podcast".to_string());

    let description = raw
        .description
        .map(|d| d.content.trim().to_string())
        .unwrap_or_default();

    let link = raw
        .links
        .iter()
        .find(|l| l.rel.as_deref().map_or(true, |rel| rel == "alternate"))
        .map(|l| l.href.clone())
        .unwrap_or_else(|| url.to_string());

    let image = raw
        .logo
        .or(raw.icon)
        .map(|img| img.uri)
        .unwrap_or_default();

    let id = format!("rss_{}_{}", slugify(&title), Utc::now().timestamp_millis());
    let mut itunes_authors = itunes_authors.into_iter();
    let tracks = raw
        .entries
        .into_iter()
        .map(|entry| parse_entry(entry, itunes_authors.next().flatten()))
        .collect();

    Feed {
        id,
        title,
        description,
        link,
        image,
        tracks,
        url: None,
        last_updated: None,
    }
}

fn parse_entry(entry: Entry, itunes_author: Option<String>) -> Track {
    let title = entry
        .title
        .as_ref()
        .map(|t| t.content.trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| "Untitled Episode".to_string());

    let description = entry
        .summary
        .as_ref()
        .map(|s| s.content.clone())
        .or_else(|| entry.content.as_ref().and_then(|c| c.body.clone()))
        .or_else(|| {
            entry
                .media
                .iter()
                .find_map(|m| m.description.as_ref().map(|d| d.content.clone()))
        })
        .unwrap_or_default();

    let pub_date = entry
        .published
        .or(entry.updated)
        .unwrap_or_else(Utc::now)
        .to_rfc3339();

    let id = if entry.id.trim().is_empty() {
        generated_track_id(Some(&slugify(&title)))
    } else {
        entry.id.trim().to_string()
    };

    // enclosure / media:content, y como último recurso un link de tipo enclosure
    let audio_url = entry
        .media
        .iter()
        .flat_map(|m| m.content.iter())
        .find_map(|c| c.url.as_ref().map(|u| u.to_string()))
        .or_else(|| {
            entry
                .links
                .iter()
                .find(|l| l.rel.as_deref() == Some("enclosure"))
                .map(|l| l.href.clone())
        })
        .unwrap_or_default();

    let album_art = entry
        .media
        .iter()
        .flat_map(|m| m.thumbnails.iter())
        .map(|t| t.image.uri.clone())
        .next()
        .unwrap_or_default();

    let duration = entry
        .media
        .iter()
        .find_map(|m| m.duration.or_else(|| m.content.iter().find_map(|c| c.duration)))
        .map(format_duration)
        .unwrap_or_default();

    let artist = itunes_author
        .or_else(|| {
            entry
                .authors
                .first()
                .map(|p| p.name.trim().to_string())
        })
        .unwrap_or_default();

    Track {
        id,
        title,
        description: clean_description(description.trim()),
        audio_url,
        album_art,
        pub_date,
        duration,
        artist,
    }
}

/// Formato tipo `itunes:duration`: `H:MM:SS` o `M:SS`.
fn format_duration(duration: Duration) -> String {
    let total = duration.as_secs();
    let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}
