use chrono::Utc;
use serde_json::Value;
use tracing::error;

use super::{
    text::{generated_feed_id, generated_track_id},
    Feed, Track,
};
use crate::error::{FeedError, FeedResult};

/// Parsea el formato JSON propio del reproductor.
///
/// Acepta un feed suelto o el formato legacy `{ "feeds": [...] }`, del que se
/// toma el primer feed. `link` siempre apunta a la URL de origen.
pub fn parse_json(text: &str, url: &str) -> FeedResult<Feed> {
    let data: Value = serde_json::from_str(text).map_err(|e| {
        error!("Error parsing JSON feed: {}", e);
        FeedError::InvalidJson
    })?;

    let feed_value = match data.get("feeds") {
        Some(Value::Array(feeds)) => feeds.first().ok_or_else(|| {
            error!("Error parsing JSON feed: empty feeds array");
            FeedError::InvalidJson
        })?,
        _ => &data,
    };

    if !feed_value.is_object() {
        error!("Error parsing JSON feed: expected an object");
        return Err(FeedError::InvalidJson);
    }

    Ok(feed_from_value(feed_value, Some(url)))
}

/// Normaliza un objeto JSON de feed aplicando los valores por defecto.
///
/// Con `link = None` se conserva el `link` del documento (feeds por defecto).
pub fn feed_from_value(value: &Value, link: Option<&str>) -> Feed {
    let tracks = value
        .get("tracks")
        .and_then(Value::as_array)
        .map(|tracks| tracks.iter().map(track_from_value).collect())
        .unwrap_or_default();

    Feed {
        id: field(value, "id").unwrap_or_else(generated_feed_id),
        title: field(value, "title").unwrap_or_else(|| "Untitled Feed".to_string()),
        description: field(value, "description").unwrap_or_default(),
        link: match link {
            Some(link) => link.to_string(),
            None => field(value, "link").unwrap_or_default(),
        },
        image: field(value, "image").unwrap_or_default(),
        tracks,
        url: field(value, "url"),
        last_updated: value
            .get("lastUpdated")
            .and_then(|v| serde_json::from_value(v.clone()).ok()),
    }
}

fn track_from_value(value: &Value) -> Track {
    Track {
        id: field(value, "id").unwrap_or_else(|| generated_track_id(None)),
        title: field(value, "title").unwrap_or_else(|| "Untitled Track".to_string()),
        description: field(value, "description").unwrap_or_default(),
        audio_url: field(value, "audioUrl").unwrap_or_default(),
        album_art: field(value, "albumArt").unwrap_or_default(),
        pub_date: field(value, "pubDate").unwrap_or_else(|| Utc::now().to_rfc3339()),
        duration: field(value, "duration").unwrap_or_default(),
        artist: field(value, "artist").unwrap_or_default(),
    }
}

/// Campo no vacío como texto; los números se aceptan (p. ej. `"duration": 312`).
fn field(value: &Value, key: &str) -> Option<String> {
    match value.get(key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) if n.as_f64() != Some(0.0) => Some(n.to_string()),
        _ => None,
    }
}
