use serde::{Deserialize, Serialize};

/// Estado persistido para reanudar la reproducción.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlayerState {
    pub feed_id: Option<String>,
    pub track_index: usize,
    pub current_time: f64,
    pub playback_rate: f64,
}

impl Default for PlayerState {
    fn default() -> Self {
        Self {
            feed_id: None,
            track_index: 0,
            current_time: 0.0,
            playback_rate: 1.0,
        }
    }
}
