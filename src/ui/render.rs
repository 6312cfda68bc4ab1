use crate::{
    feed::{Feed, Track},
    library::RefreshOutcome,
    player::{format_time, PlayerEvent, PlayerSession},
    sources::DiscoveredFeed,
};

const DESCRIPTION_WIDTH: usize = 72;

/// Nivel de un aviso en la terminal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NoticeKind {
    Info,
    Success,
    Warning,
    Error,
}

pub fn notice(kind: NoticeKind, message: &str) -> String {
    let icon = match kind {
        NoticeKind::Info => "ℹ️",
        NoticeKind::Success => "✅",
        NoticeKind::Warning => "⚠️",
        NoticeKind::Error => "❌",
    };
    format!("{} {}", icon, message)
}

/// Lista de feeds; el feed activo se marca con `>`.
pub fn feed_list(feeds: &[Feed], active: Option<&str>) -> String {
    if feeds.is_empty() {
        return notice(NoticeKind::Warning, "No feeds available");
    }

    feeds
        .iter()
        .map(|feed| {
            let marker = if Some(feed.id.as_str()) == active { ">" } else { " " };
            let kind = if feed.is_custom() { "custom" } else { "default" };
            format!(
                "{} [{}] {} ({} pistas, {})",
                marker,
                feed.id,
                feed.title,
                feed.tracks.len(),
                kind
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Cabecera del feed más su lista de pistas numeradas desde 1.
pub fn feed_detail(feed: &Feed, current: Option<usize>) -> String {
    let mut out = format!("📻 {}", feed.title);
    if !feed.description.is_empty() {
        out.push('\n');
        out.push_str(&truncate(&feed.description, DESCRIPTION_WIDTH));
    }
    out.push('\n');
    out.push_str(&track_list(&feed.tracks, current));
    out
}

pub fn track_list(tracks: &[Track], current: Option<usize>) -> String {
    if tracks.is_empty() {
        return "😴 Este feed no tiene pistas".to_string();
    }

    tracks
        .iter()
        .enumerate()
        .map(|(i, track)| {
            let marker = if Some(i) == current { "▶" } else { " " };
            let duration = if track.duration.is_empty() {
                String::new()
            } else {
                format!(" [{}]", track.duration)
            };
            let artist = if track.artist.is_empty() {
                String::new()
            } else {
                format!(" - {}", track.artist)
            };
            format!("{} {:>3}. {}{}{}", marker, i + 1, track.title, artist, duration)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn now_playing(player: &PlayerSession) -> String {
    let Some(track) = player.current_track() else {
        return "⏹️ Nada cargado".to_string();
    };

    let state = if player.is_playing() { "▶️" } else { "⏸️" };
    let total = player
        .duration()
        .map(format_time)
        .unwrap_or_else(|| "--:--".to_string());
    let speed = if (player.playback_rate() - 1.0).abs() > f64::EPSILON {
        format!(" x{}", player.playback_rate())
    } else {
        String::new()
    };

    format!(
        "{} {} {} / {}{}",
        state,
        track.title,
        format_time(player.position()),
        total,
        speed
    )
}

/// Texto para un evento del reproductor; `None` si no merece una línea.
pub fn player_event(event: &PlayerEvent) -> Option<String> {
    match event {
        PlayerEvent::TrackChanged { index, track } => {
            Some(format!("🎵 {}. {}", index + 1, track.title))
        }
        PlayerEvent::PlayStateChanged(_) | PlayerEvent::TimeUpdate { .. } => None,
        PlayerEvent::Error(message) => Some(notice(NoticeKind::Error, message)),
    }
}

pub fn discovered(feeds: &[DiscoveredFeed]) -> String {
    if feeds.is_empty() {
        return notice(NoticeKind::Warning, "No se encontraron feeds");
    }
    feeds
        .iter()
        .map(|feed| format!("  {} <{}>", feed.title, feed.url))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn refresh_outcomes(outcomes: &[(String, RefreshOutcome)]) -> String {
    if outcomes.is_empty() {
        return notice(NoticeKind::Info, "No hay feeds custom");
    }
    outcomes
        .iter()
        .map(|(id, outcome)| match outcome {
            RefreshOutcome::Fresh => format!("  {} al día", id),
            RefreshOutcome::Updated => format!("  {} actualizado", id),
            RefreshOutcome::Failed(e) => format!("  {} falló: {}", id, e),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let cut: String = text.chars().take(width.saturating_sub(3)).collect();
    format!("{}...", cut.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn feeds() -> Vec<Feed> {
        vec![
            Feed {
                id: "radio".to_string(),
                title: "Radio".to_string(),
                tracks: vec![Track::default(), Track::default()],
                ..Default::default()
            },
            Feed {
                id: "rss_night_1".to_string(),
                title: "Night".to_string(),
                ..Default::default()
            }
            .stamp("https://night.example.com/rss", Utc::now()),
        ]
    }

    #[test]
    fn test_feed_list() {
        let out = feed_list(&feeds(), Some("radio"));
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "> [radio] Radio (2 pistas, default)");
        assert_eq!(lines[1], "  [rss_night_1] Night (0 pistas, custom)");
        assert!(feed_list(&[], None).contains("No feeds available"));
    }

    #[test]
    fn test_track_list() {
        let tracks = vec![
            Track {
                title: "Intro".to_string(),
                artist: "DJ".to_string(),
                duration: "3:10".to_string(),
                ..Default::default()
            },
            Track {
                title: "Outro".to_string(),
                ..Default::default()
            },
        ];
        let out = track_list(&tracks, Some(1));
        assert_eq!(out, "    1. Intro - DJ [3:10]\n▶   2. Outro");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a very long description", 10), "a very...");
    }

    #[test]
    fn test_player_event_lines() {
        let event = PlayerEvent::TrackChanged {
            index: 0,
            track: Track {
                title: "Intro".to_string(),
                ..Default::default()
            },
        };
        assert_eq!(player_event(&event).as_deref(), Some("🎵 1. Intro"));
        assert_eq!(player_event(&PlayerEvent::PlayStateChanged(true)), None);
    }
}
