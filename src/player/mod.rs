//! # Player Module
//!
//! Headless playback session over a feed's track list.
//!
//! The session owns the transport state (current track, position, rate,
//! play/pause) and drives a [`PlaybackBackend`] that produces the actual
//! sound. Position advances through [`PlayerSession::tick`], called by the
//! front end on a timer; reaching the end of a track moves to the next one.
//!
//! State changes are published as [`PlayerEvent`]s on a `flume` channel so
//! the terminal front end can render them without polling.

pub mod backend;
pub mod state;

use std::time::Duration;
use tracing::{debug, error, info};

use crate::{
    feed::{Feed, Track},
    storage::JsonStorage,
};

pub use backend::{BackendCall, PlaybackBackend, ProcessBackend, SilentBackend};
pub use state::PlayerState;

pub const MIN_PLAYBACK_RATE: f64 = 0.25;
pub const MAX_PLAYBACK_RATE: f64 = 2.5;

/// Por encima de este punto, "anterior" reinicia la pista actual.
const RESTART_THRESHOLD_SECS: f64 = 3.0;
const SAVE_EVERY_SECS: u64 = 5;

const VIDEO_EXTENSIONS: [&str; 5] = [".mp4", ".webm", ".mkv", ".mov", ".avi"];

#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    TrackChanged { index: usize, track: Track },
    PlayStateChanged(bool),
    TimeUpdate { current: f64, duration: Option<f64> },
    Error(String),
}

#[derive(Debug, Clone)]
pub struct PlayerOptions {
    pub autoplay: bool,
    pub persist_state: bool,
}

impl Default for PlayerOptions {
    fn default() -> Self {
        Self {
            autoplay: false,
            persist_state: true,
        }
    }
}

pub struct PlayerSession {
    backend: Box<dyn PlaybackBackend>,
    events: flume::Sender<PlayerEvent>,
    storage: Option<JsonStorage>,
    options: PlayerOptions,

    feed: Option<Feed>,
    tracks: Vec<Track>,
    current_index: usize,
    current_track: Option<Track>,
    source: Option<String>,

    playing: bool,
    position: f64,
    duration: Option<f64>,
    playback_rate: f64,

    restored: Option<PlayerState>,
    last_saved_second: Option<u64>,
}

impl PlayerSession {
    pub fn new(
        backend: Box<dyn PlaybackBackend>,
        options: PlayerOptions,
    ) -> (Self, flume::Receiver<PlayerEvent>) {
        let (tx, rx) = flume::unbounded();
        let session = Self {
            backend,
            events: tx,
            storage: None,
            options,
            feed: None,
            tracks: Vec::new(),
            current_index: 0,
            current_track: None,
            source: None,
            playing: false,
            position: 0.0,
            duration: None,
            playback_rate: 1.0,
            restored: None,
            last_saved_second: None,
        };
        (session, rx)
    }

    pub fn with_storage(mut self, storage: JsonStorage) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Carga el estado persistido para aplicarlo cuando se cargue su feed.
    pub async fn restore_from_storage(&mut self) {
        if !self.options.persist_state {
            return;
        }
        let Some(storage) = &self.storage else {
            return;
        };
        match storage.load_player_state().await {
            Ok(Some(state)) => self.restore_state(state),
            Ok(None) => {}
            Err(e) => error!("Error restoring player state: {}", e),
        }
    }

    pub fn restore_state(&mut self, state: PlayerState) {
        self.restored = Some(state);
    }

    pub fn restored_feed_id(&self) -> Option<&str> {
        self.restored.as_ref().and_then(|s| s.feed_id.as_deref())
    }

    /// Reemplaza la lista de pistas y carga la primera.
    pub async fn set_feed(&mut self, feed: Feed) {
        info!("📻 Feed cargado: {} ({} pistas)", feed.title, feed.tracks.len());
        self.tracks = feed.tracks.clone();
        self.feed = Some(feed);
        self.current_index = 0;

        if !self.tracks.is_empty() {
            self.load_track(0).await;
        }
    }

    pub async fn load_track(&mut self, index: usize) {
        if index >= self.tracks.len() {
            self.emit_error(format!("Invalid track index: {}", index));
            return;
        }

        self.current_index = index;
        let track = self.tracks[index].clone();
        self.current_track = Some(track.clone());

        if self.playing {
            self.stop_backend().await;
            self.set_playing(false);
        }
        self.position = 0.0;
        self.last_saved_second = None;

        if track.audio_url.is_empty() {
            self.source = None;
            self.duration = None;
            self.emit_error("Track has no audio URL".to_string());
            return;
        }

        self.source = Some(track.audio_url.clone());
        self.duration = parse_clock(&track.duration);
        if is_video_file(&track.audio_url) {
            debug!("Pista de video, se reproduce solo el audio: {}", track.title);
        }

        self.emit(PlayerEvent::TrackChanged { index, track });

        if self.options.autoplay {
            self.play().await;
        }

        self.save_state().await;
    }

    /// No hace nada si no hay una fuente cargada.
    pub async fn play(&mut self) {
        let Some(source) = self.source.clone() else {
            return;
        };

        match self
            .backend
            .start(&source, self.position, self.playback_rate)
            .await
        {
            Ok(()) => self.set_playing(true),
            Err(e) => self.emit_error(e.to_string()),
        }
    }

    pub async fn pause(&mut self) {
        if !self.playing {
            return;
        }
        self.stop_backend().await;
        self.set_playing(false);
    }

    pub async fn toggle_play_pause(&mut self) {
        if self.playing {
            self.pause().await;
        } else {
            self.play().await;
        }
    }

    pub async fn next(&mut self) -> bool {
        if self.tracks.is_empty() {
            return false;
        }

        let next_index = (self.current_index + 1) % self.tracks.len();
        self.load_track(next_index).await;
        self.play_if_stopped().await;
        true
    }

    pub async fn previous(&mut self) -> bool {
        if self.tracks.is_empty() {
            return false;
        }

        if self.position > RESTART_THRESHOLD_SECS {
            self.position = 0.0;
            self.restart_if_playing().await;
            return true;
        }

        let len = self.tracks.len();
        let prev_index = (self.current_index + len - 1) % len;
        self.load_track(prev_index).await;
        self.play_if_stopped().await;
        true
    }

    /// Sin duración conocida no se puede buscar.
    pub async fn seek_to(&mut self, time: f64) {
        let Some(duration) = self.duration else {
            return;
        };
        if time.is_nan() {
            return;
        }

        self.position = time.clamp(0.0, duration);
        self.restart_if_playing().await;
    }

    pub async fn set_playback_speed(&mut self, rate: f64) {
        if rate.is_nan() {
            return;
        }
        self.playback_rate = rate.clamp(MIN_PLAYBACK_RATE, MAX_PLAYBACK_RATE);
        self.restart_if_playing().await;
        self.save_state().await;
    }

    /// Metadata cargada: fija la duración real de la pista.
    pub fn set_duration(&mut self, duration: f64) {
        if duration.is_finite() && duration > 0.0 {
            self.duration = Some(duration);
        }
    }

    /// Avanza el reloj de reproducción.
    pub async fn tick(&mut self, elapsed: Duration) {
        if !self.playing {
            return;
        }

        self.position += elapsed.as_secs_f64() * self.playback_rate;
        let mut ended = self.backend.is_finished();
        if let Some(duration) = self.duration {
            if self.position >= duration {
                self.position = duration;
                ended = true;
            }
        }

        self.emit(PlayerEvent::TimeUpdate {
            current: self.position,
            duration: self.duration,
        });

        let second = self.position.floor() as u64;
        if second % SAVE_EVERY_SECS == 0 && self.last_saved_second != Some(second) {
            self.last_saved_second = Some(second);
            self.save_state().await;
        }

        if ended {
            info!("⏭️ Pista terminada, pasando a la siguiente");
            self.next().await;
        }
    }

    pub async fn save_state(&self) {
        if !self.options.persist_state {
            return;
        }
        let Some(storage) = &self.storage else {
            return;
        };
        if let Err(e) = storage.save_player_state(&self.state()).await {
            error!("Error saving player state: {}", e);
        }
    }

    pub fn state(&self) -> PlayerState {
        PlayerState {
            feed_id: self.feed.as_ref().map(|f| f.id.clone()),
            track_index: self.current_index,
            current_time: self.position,
            playback_rate: self.playback_rate,
        }
    }

    /// Aplica el estado restaurado si corresponde al feed actual.
    /// El estado pendiente se descarta en cualquier caso.
    pub async fn apply_restored_state(&mut self) {
        let Some(restored) = self.restored.take() else {
            return;
        };
        let Some(feed_id) = self.feed.as_ref().map(|f| f.id.clone()) else {
            self.restored = Some(restored);
            return;
        };

        if restored.feed_id.as_deref() != Some(feed_id.as_str())
            || restored.track_index >= self.tracks.len()
        {
            return;
        }

        info!(
            "⏯️ Restaurando pista {} en {}",
            restored.track_index,
            format_time(restored.current_time)
        );
        self.load_track(restored.track_index).await;

        if restored.current_time > 0.0 {
            self.position = match self.duration {
                Some(duration) => restored.current_time.min(duration),
                None => restored.current_time,
            };
        }
        if restored.playback_rate > 0.0 {
            self.set_playback_speed(restored.playback_rate).await;
        }
    }

    /// Detiene la reproducción y olvida el feed cargado.
    pub async fn unload(&mut self) {
        if self.playing {
            self.stop_backend().await;
            self.set_playing(false);
        }
        self.feed = None;
        self.tracks.clear();
        self.current_index = 0;
        self.current_track = None;
        self.source = None;
        self.position = 0.0;
        self.duration = None;
        self.restored = None;
    }

    pub async fn shutdown(&mut self) {
        self.save_state().await;
        self.stop_backend().await;
        self.playing = false;
    }

    pub fn current_track(&self) -> Option<&Track> {
        self.current_track.as_ref()
    }

    pub fn current_feed(&self) -> Option<&Feed> {
        self.feed.as_ref()
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn duration(&self) -> Option<f64> {
        self.duration
    }

    pub fn playback_rate(&self) -> f64 {
        self.playback_rate
    }

    /// Con autoplay, `load_track` ya arrancó la reproducción.
    async fn play_if_stopped(&mut self) {
        if !self.playing {
            self.play().await;
        }
    }

    async fn restart_if_playing(&mut self) {
        if self.playing {
            self.play().await;
        }
    }

    async fn stop_backend(&mut self) {
        if let Err(e) = self.backend.stop().await {
            self.emit_error(e.to_string());
        }
    }

    fn set_playing(&mut self, playing: bool) {
        if self.playing != playing {
            self.playing = playing;
            self.emit(PlayerEvent::PlayStateChanged(playing));
        }
    }

    fn emit_error(&self, message: String) {
        error!("Player error: {}", message);
        self.emit(PlayerEvent::Error(message));
    }

    fn emit(&self, event: PlayerEvent) {
        // sin receptor no hay nadie a quien avisar
        let _ = self.events.send(event);
    }
}

/// Extensiones que el navegador trataba como video.
pub fn is_video_file(url: &str) -> bool {
    if url.is_empty() {
        return false;
    }
    let lower = url.to_lowercase();
    VIDEO_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

/// `M:SS`; cero, negativos y NaN se muestran como `0:00`.
pub fn format_time(seconds: f64) -> String {
    if !seconds.is_finite() || seconds <= 0.0 {
        return "0:00".to_string();
    }
    let total = seconds.floor() as u64;
    format!("{}:{:02}", total / 60, total % 60)
}

/// Duración de una pista en `SS`, `M:SS` o `H:MM:SS`; cero cuenta como desconocida.
pub fn parse_clock(text: &str) -> Option<f64> {
    clock_seconds(text).filter(|total| *total > 0.0)
}

/// Posición en `SS`, `M:SS` o `H:MM:SS`; admite `0:00`.
pub fn clock_seconds(text: &str) -> Option<f64> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    let mut total = 0.0;
    for part in text.split(':') {
        let value: f64 = part.trim().parse().ok()?;
        if !value.is_finite() || value < 0.0 {
            return None;
        }
        total = total * 60.0 + value;
    }
    Some(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn track(id: &str, audio: &str, duration: &str) -> Track {
        Track {
            id: id.to_string(),
            title: format!("Track {}", id),
            audio_url: audio.to_string(),
            duration: duration.to_string(),
            ..Default::default()
        }
    }

    fn feed() -> Feed {
        Feed {
            id: "radio".to_string(),
            title: "Radio".to_string(),
            tracks: vec![
                track("a", "https://cdn.example.com/a.mp3", "1:00"),
                track("b", "https://cdn.example.com/b.mp3", "2:00"),
                track("c", "", ""),
            ],
            ..Default::default()
        }
    }

    fn session(options: PlayerOptions) -> (PlayerSession, SilentBackend, flume::Receiver<PlayerEvent>) {
        let backend = SilentBackend::new();
        let (session, rx) = PlayerSession::new(Box::new(backend.clone()), options);
        (session, backend, rx)
    }

    #[tokio::test]
    async fn test_set_feed_loads_first_track() {
        let (mut player, backend, rx) = session(PlayerOptions::default());
        player.set_feed(feed()).await;

        assert_eq!(player.current_index(), 0);
        assert_eq!(player.current_track().unwrap().id, "a");
        assert_eq!(player.duration(), Some(60.0));
        assert!(!player.is_playing());
        assert!(backend.calls().is_empty());
        assert!(matches!(rx.try_recv(), Ok(PlayerEvent::TrackChanged { index: 0, .. })));
    }

    #[tokio::test]
    async fn test_autoplay_starts_backend() {
        let (mut player, backend, _rx) = session(PlayerOptions {
            autoplay: true,
            persist_state: false,
        });
        player.set_feed(feed()).await;

        assert!(player.is_playing());
        assert_eq!(
            backend.calls(),
            vec![BackendCall::Start {
                url: "https://cdn.example.com/a.mp3".to_string(),
                position: 0.0,
                rate: 1.0,
            }]
        );
    }

    #[tokio::test]
    async fn test_invalid_index_and_missing_audio() {
        let (mut player, _backend, rx) = session(PlayerOptions::default());
        player.set_feed(feed()).await;
        rx.drain().for_each(drop);

        player.load_track(9).await;
        assert_eq!(rx.try_recv(), Ok(PlayerEvent::Error("Invalid track index: 9".to_string())));
        assert_eq!(player.current_index(), 0);

        player.load_track(2).await;
        assert_eq!(rx.try_recv(), Ok(PlayerEvent::Error("Track has no audio URL".to_string())));
        assert_eq!(player.current_index(), 2);

        // sin fuente, play no hace nada
        player.play().await;
        assert!(!player.is_playing());
    }

    #[tokio::test]
    async fn test_next_and_previous_wrap() {
        let (mut player, _backend, _rx) = session(PlayerOptions::default());
        assert!(!player.next().await);

        player.set_feed(feed()).await;
        assert!(player.previous().await);
        assert_eq!(player.current_index(), 2);

        assert!(player.next().await);
        assert_eq!(player.current_index(), 0);
        assert!(player.is_playing());

        assert!(player.next().await);
        assert_eq!(player.current_index(), 1);
    }

    #[tokio::test]
    async fn test_previous_restarts_after_three_seconds() {
        let (mut player, backend, _rx) = session(PlayerOptions::default());
        player.set_feed(feed()).await;
        player.next().await;
        player.tick(Duration::from_secs(10)).await;
        assert_eq!(player.position(), 10.0);

        assert!(player.previous().await);
        assert_eq!(player.current_index(), 1);
        assert_eq!(player.position(), 0.0);
        assert!(matches!(
            backend.calls().last(),
            Some(BackendCall::Start { position, .. }) if *position == 0.0
        ));
    }

    #[tokio::test]
    async fn test_seek_and_speed_are_clamped() {
        let (mut player, _backend, _rx) = session(PlayerOptions::default());
        player.seek_to(10.0).await;
        assert_eq!(player.position(), 0.0);

        player.set_feed(feed()).await;
        player.seek_to(500.0).await;
        assert_eq!(player.position(), 60.0);
        player.seek_to(-3.0).await;
        assert_eq!(player.position(), 0.0);

        player.set_playback_speed(10.0).await;
        assert_eq!(player.playback_rate(), MAX_PLAYBACK_RATE);
        player.set_playback_speed(0.1).await;
        assert_eq!(player.playback_rate(), MIN_PLAYBACK_RATE);
    }

    #[tokio::test]
    async fn test_tick_advances_and_ends_track() {
        let (mut player, _backend, rx) = session(PlayerOptions::default());
        player.set_feed(feed()).await;
        player.set_playback_speed(2.0).await;
        player.play().await;
        rx.drain().for_each(drop);

        player.tick(Duration::from_secs(10)).await;
        assert_eq!(player.position(), 20.0);
        assert_eq!(
            rx.try_recv(),
            Ok(PlayerEvent::TimeUpdate { current: 20.0, duration: Some(60.0) })
        );

        player.tick(Duration::from_secs(30)).await;
        assert_eq!(player.current_index(), 1);
        assert_eq!(player.position(), 0.0);
        assert!(player.is_playing());
    }

    #[tokio::test]
    async fn test_backend_finish_moves_on() {
        let (mut player, backend, _rx) = session(PlayerOptions::default());
        let mut f = feed();
        f.tracks[0].duration.clear();
        player.set_feed(f).await;
        player.play().await;

        backend.finish();
        player.tick(Duration::from_millis(100)).await;
        assert_eq!(player.current_index(), 1);
    }

    #[tokio::test]
    async fn test_state_persistence_and_restore() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonStorage::new(dir.path().to_path_buf()).await.unwrap();

        let (player, _backend, _rx) = session(PlayerOptions::default());
        let mut player = player.with_storage(storage.clone());
        player.set_feed(feed()).await;
        player.load_track(1).await;
        player.seek_to(42.0).await;
        player.set_playback_speed(1.5).await;

        let saved = storage.load_player_state().await.unwrap().unwrap();
        assert_eq!(
            saved,
            PlayerState {
                feed_id: Some("radio".to_string()),
                track_index: 1,
                current_time: 42.0,
                playback_rate: 1.5,
            }
        );

        let (fresh, _backend, _rx) = session(PlayerOptions::default());
        let mut fresh = fresh.with_storage(storage);
        fresh.restore_from_storage().await;
        assert_eq!(fresh.restored_feed_id(), Some("radio"));

        fresh.set_feed(feed()).await;
        fresh.apply_restored_state().await;
        assert_eq!(fresh.current_index(), 1);
        assert_eq!(fresh.position(), 42.0);
        assert_eq!(fresh.playback_rate(), 1.5);
        assert_eq!(fresh.restored_feed_id(), None);
    }

    #[tokio::test]
    async fn test_restore_ignores_other_feed() {
        let (mut player, _backend, _rx) = session(PlayerOptions::default());
        player.restore_state(PlayerState {
            feed_id: Some("other".to_string()),
            track_index: 1,
            current_time: 30.0,
            playback_rate: 2.0,
        });
        player.set_feed(feed()).await;
        player.apply_restored_state().await;

        assert_eq!(player.current_index(), 0);
        assert_eq!(player.playback_rate(), 1.0);
        assert_eq!(player.restored_feed_id(), None);
    }

    #[test]
    fn test_helpers() {
        assert_eq!(format_time(0.0), "0:00");
        assert_eq!(format_time(f64::NAN), "0:00");
        assert_eq!(format_time(75.9), "1:15");
        assert_eq!(format_time(3600.0), "60:00");

        assert!(is_video_file("https://cdn.example.com/clip.MP4"));
        assert!(!is_video_file("https://cdn.example.com/ep.mp3"));
        assert!(!is_video_file(""));

        assert_eq!(parse_clock("1:02:03"), Some(3723.0));
        assert_eq!(parse_clock("312"), Some(312.0));
        assert_eq!(parse_clock(""), None);
        assert_eq!(parse_clock("soon"), None);
        assert_eq!(parse_clock("0:00"), None);

        assert_eq!(clock_seconds("0:00"), Some(0.0));
        assert_eq!(clock_seconds("1:30"), Some(90.0));
        assert_eq!(clock_seconds("-1:00"), None);
    }

    #[tokio::test]
    async fn test_autoplay_skip_starts_once() {
        let (mut player, backend, _rx) = session(PlayerOptions {
            autoplay: true,
            persist_state: false,
        });
        player.set_feed(feed()).await;
        player.next().await;
        player.previous().await;

        let starts = backend
            .calls()
            .iter()
            .filter(|call| matches!(call, BackendCall::Start { .. }))
            .count();
        assert_eq!(starts, 3);
        assert_eq!(player.current_index(), 0);
        assert!(player.is_playing());
    }

    #[tokio::test]
    async fn test_tick_saves_on_five_second_marks() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonStorage::new(dir.path().to_path_buf()).await.unwrap();

        let (player, _backend, _rx) = session(PlayerOptions::default());
        let mut player = player.with_storage(storage.clone());
        player.set_feed(feed()).await;
        player.play().await;

        player.tick(Duration::from_secs(2)).await;
        let saved = storage.load_player_state().await.unwrap().unwrap();
        assert_eq!(saved.current_time, 0.0);

        player.tick(Duration::from_secs(3)).await;
        let saved = storage.load_player_state().await.unwrap().unwrap();
        assert_eq!(saved.current_time, 5.0);

        player.tick(Duration::from_secs(1)).await;
        let saved = storage.load_player_state().await.unwrap().unwrap();
        assert_eq!(saved.current_time, 5.0);
    }

    #[tokio::test]
    async fn test_unload_stops_and_forgets_feed() {
        let (mut player, backend, _rx) = session(PlayerOptions::default());
        player.set_feed(feed()).await;
        player.play().await;

        player.unload().await;
        assert!(!player.is_playing());
        assert!(player.current_feed().is_none());
        assert!(player.current_track().is_none());
        assert_eq!(backend.calls().last(), Some(&BackendCall::Stop));
    }
}
