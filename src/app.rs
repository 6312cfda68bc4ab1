use anyhow::Result;
use std::{
    future::Future,
    time::{Duration, Instant},
};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};

use crate::{
    cache::BodyCache,
    library::FeedLibrary,
    player::{PlayerEvent, PlayerSession},
    sources,
    storage::JsonStorage,
    ui::{notice, render, Command, NoticeKind, RefreshTarget, HELP},
};

const TICK_INTERVAL: Duration = Duration::from_millis(500);
const CACHE_CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

/// Resultado de ejecutar un comando.
#[derive(Debug, PartialEq)]
pub enum Flow {
    Continue(String),
    Quit,
}

/// Une la biblioteca de feeds con la sesión del reproductor.
pub struct App {
    library: FeedLibrary,
    player: PlayerSession,
    events: flume::Receiver<PlayerEvent>,
    storage: JsonStorage,
    body_cache: Option<BodyCache>,
}

impl App {
    pub fn new(
        library: FeedLibrary,
        player: PlayerSession,
        events: flume::Receiver<PlayerEvent>,
        storage: JsonStorage,
    ) -> Self {
        Self {
            library,
            player,
            events,
            storage,
            body_cache: None,
        }
    }

    /// Caché de cuerpos a limpiar en la sesión interactiva y a mostrar en `stats`.
    pub fn with_body_cache(mut self, cache: BodyCache) -> Self {
        self.body_cache = Some(cache);
        self
    }

    pub fn library(&self) -> &FeedLibrary {
        &self.library
    }

    pub fn player(&self) -> &PlayerSession {
        &self.player
    }

    /// Restaura el feed guardado o, si no existe, carga el primero.
    pub async fn load_initial_feed(&mut self) -> String {
        self.player.restore_from_storage().await;

        let restored = self
            .player
            .restored_feed_id()
            .and_then(|id| self.library.feed_by_id(id))
            .map(|feed| feed.id.clone());

        let target = restored.or_else(|| self.library.all_feeds().first().map(|f| f.id.clone()));
        match target {
            Some(id) => self.load_feed(&id).await,
            None => notice(NoticeKind::Warning, "No feeds available"),
        }
    }

    async fn load_feed(&mut self, id: &str) -> String {
        let Some(feed) = self.library.feed_by_id(id).cloned() else {
            return notice(NoticeKind::Error, "Feed not found");
        };

        self.player.set_feed(feed.clone()).await;
        self.player.apply_restored_state().await;
        render::feed_detail(&feed, Some(self.player.current_index()))
    }

    pub async fn execute(&mut self, command: Command) -> Result<Flow> {
        let active = self.player.current_feed().map(|f| f.id.clone());

        let output = match command {
            Command::Feeds => render::feed_list(self.library.all_feeds(), active.as_deref()),
            Command::Show(id) => match self.library.feed_by_id(&id) {
                Some(feed) => {
                    let current = (active.as_deref() == Some(id.as_str()))
                        .then(|| self.player.current_index());
                    render::feed_detail(feed, current)
                }
                None => notice(NoticeKind::Error, "Feed not found"),
            },
            Command::Add(url) => match self.library.add_feed(&url).await {
                Ok(feed) => notice(
                    NoticeKind::Success,
                    &format!("Feed agregado: {} [{}] ({} pistas)", feed.title, feed.id, feed.tracks.len()),
                ),
                Err(e) => notice(NoticeKind::Error, &e.to_string()),
            },
            Command::Remove(id) => {
                if self.library.remove_feed(&id).await {
                    notice(NoticeKind::Success, &format!("Feed eliminado: {}", id))
                } else {
                    notice(NoticeKind::Warning, "Solo se pueden eliminar feeds custom")
                }
            }
            Command::Refresh(RefreshTarget::Feed(id)) => match self.library.refresh_feed(&id).await {
                Ok(feed) => notice(
                    NoticeKind::Success,
                    &format!("{} ({} pistas)", feed.title, feed.tracks.len()),
                ),
                Err(e) => notice(NoticeKind::Error, &e.to_string()),
            },
            Command::Refresh(RefreshTarget::All) => {
                let outcomes = self.library.refresh_all().await;
                render::refresh_outcomes(&outcomes)
            }
            Command::Clear => {
                self.clear_all_data().await;
                notice(NoticeKind::Success, "Feeds custom eliminados")
            }
            Command::Discover(url) => render::discovered(&self.library.discover_feeds(&url).await),
            Command::Detect(url) => {
                if sources::detect_feed_type(self.library.source(), &url).await {
                    notice(NoticeKind::Success, "Parece un feed válido")
                } else {
                    notice(NoticeKind::Warning, "URL does not appear to be a valid feed")
                }
            }
            Command::Parse(url) => match sources::parse_feed(self.library.source(), &url).await {
                Ok(feed) => serde_json::to_string_pretty(&feed)?,
                Err(e) => notice(NoticeKind::Error, &e.to_string()),
            },
            Command::Load(id) => self.load_feed(&id).await,
            Command::Play(Some(n)) => {
                self.player.load_track(n.saturating_sub(1)).await;
                self.player.play().await;
                render::now_playing(&self.player)
            }
            Command::Play(None) => {
                if self.player.current_track().is_none() {
                    notice(NoticeKind::Warning, "Carga un feed primero (load <id>)")
                } else {
                    self.player.play().await;
                    render::now_playing(&self.player)
                }
            }
            Command::Pause => {
                self.player.pause().await;
                render::now_playing(&self.player)
            }
            Command::Next => {
                self.player.next().await;
                render::now_playing(&self.player)
            }
            Command::Prev => {
                self.player.previous().await;
                render::now_playing(&self.player)
            }
            Command::Seek(secs) => {
                self.player.seek_to(secs).await;
                render::now_playing(&self.player)
            }
            Command::Speed(rate) => {
                self.player.set_playback_speed(rate).await;
                render::now_playing(&self.player)
            }
            Command::Status => render::now_playing(&self.player),
            Command::Stats => {
                let mut out = self.storage.stats().await?.to_string();
                if let Some(cache) = &self.body_cache {
                    out.push('\n');
                    out.push_str(&cache.metrics().to_string());
                }
                out
            }
            Command::Help => HELP.to_string(),
            Command::Quit => return Ok(Flow::Quit),
        };

        Ok(Flow::Continue(output))
    }

    /// Borra los feeds custom y el estado guardado, y vuelve al primer feed.
    async fn clear_all_data(&mut self) {
        self.library.clear_custom_feeds().await;
        if let Err(e) = self.storage.clear_player_state().await {
            error!("Error clearing player state: {}", e);
        }

        match self.library.all_feeds().first().map(|feed| feed.id.clone()) {
            Some(id) => {
                self.load_feed(&id).await;
            }
            None => self.player.unload().await,
        }
    }

    /// Quita del caché los cuerpos vencidos.
    pub fn cleanup_cache(&self) -> usize {
        self.body_cache
            .as_ref()
            .map_or(0, |cache| cache.cleanup_old_entries())
    }

    /// Sesión interactiva sobre stdin; termina con `quit`, EOF o `shutdown`.
    pub async fn run_interactive<F>(&mut self, initial: Command, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let input = BufReader::new(tokio::io::stdin());
        self.run_session(input, initial, shutdown).await
    }

    /// Ejecuta `initial` tras cargar el feed inicial y luego lee comandos de `input`.
    pub async fn run_session<R, F>(&mut self, input: R, initial: Command, shutdown: F) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        F: Future<Output = ()>,
    {
        println!("{}", self.load_initial_feed().await);
        match self.execute(initial).await? {
            Flow::Continue(output) => println!("{}", output),
            Flow::Quit => {
                self.player.shutdown().await;
                return Ok(());
            }
        }
        println!("{}", notice(NoticeKind::Info, "Escribe `help` para ver los comandos"));

        let mut lines = input.lines();
        let mut ticker = tokio::time::interval(TICK_INTERVAL);
        let mut cleanup = tokio::time::interval(CACHE_CLEANUP_INTERVAL);
        let mut last_tick = Instant::now();
        let events = self.events.clone();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("⚠️ Señal de shutdown recibida, cerrando...");
                    break;
                }
                line = lines.next_line() => {
                    let Some(line) = line? else {
                        break;
                    };
                    match line.parse::<Command>() {
                        Ok(command) => match self.execute(command).await? {
                            Flow::Continue(output) => println!("{}", output),
                            Flow::Quit => break,
                        },
                        Err(message) => println!("{}", notice(NoticeKind::Warning, &message)),
                    }
                }
                _ = ticker.tick() => {
                    let now = Instant::now();
                    self.player.tick(now - last_tick).await;
                    last_tick = now;
                }
                _ = cleanup.tick() => {
                    self.cleanup_cache();
                }
                event = events.recv_async() => {
                    match event {
                        Ok(event) => {
                            if let Some(line) = render::player_event(&event) {
                                println!("{}", line);
                            }
                        }
                        Err(e) => {
                            warn!("Canal de eventos cerrado: {}", e);
                            break;
                        }
                    }
                }
            }
        }

        info!("👋 Cerrando reproductor");
        self.player.shutdown().await;
        Ok(())
    }
}
