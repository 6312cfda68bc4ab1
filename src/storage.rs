use anyhow::{Context, Result};
use serde_json::Value;
use std::{io::ErrorKind, path::PathBuf};
use tokio::fs;
use tracing::{error, info, warn};

use crate::{
    feed::{json::feed_from_value, Feed},
    player::PlayerState,
};

const CUSTOM_FEEDS_FILE: &str = "custom_feeds.json";
const PLAYER_STATE_FILE: &str = "player_state.json";

/// Almacén clave/valor local basado en archivos JSON.
///
/// Guarda los feeds custom del usuario y el estado del reproductor, el
/// equivalente en disco del `localStorage` del navegador.
#[derive(Debug, Clone)]
pub struct JsonStorage {
    data_dir: PathBuf,
}

impl JsonStorage {
    pub async fn new(data_dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&data_dir)
            .await
            .with_context(|| format!("Cannot create {}", data_dir.display()))?;

        info!("📁 Storage inicializado en: {}", data_dir.display());

        Ok(Self { data_dir })
    }

    /// Carga los feeds custom.
    ///
    /// Un archivo que no contiene un array se resetea a `[]`; un archivo con
    /// JSON corrupto se deja intacto y se devuelve una lista vacía.
    pub async fn load_custom_feeds(&self) -> Result<Vec<Feed>> {
        let path = self.file_path(CUSTOM_FEEDS_FILE);
        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e).context("Error reading custom feeds"),
        };

        let value: Value = match serde_json::from_str(&content) {
            Ok(value) => value,
            Err(e) => {
                error!("Error loading custom feeds: {}", e);
                return Ok(Vec::new());
            }
        };

        match value {
            Value::Array(items) => {
                let feeds: Vec<Feed> = items
                    .iter()
                    .filter(|item| item.is_object())
                    .map(|item| feed_from_value(item, None))
                    .collect();
                info!("📂 Cargados {} feeds custom", feeds.len());
                Ok(feeds)
            }
            _ => {
                warn!("Invalid custom feeds format, resetting");
                self.save_custom_feeds(&[]).await?;
                Ok(Vec::new())
            }
        }
    }

    pub async fn save_custom_feeds(&self, feeds: &[Feed]) -> Result<()> {
        let content = serde_json::to_string_pretty(feeds)?;
        fs::write(self.file_path(CUSTOM_FEEDS_FILE), content)
            .await
            .context("Error saving custom feeds")?;
        Ok(())
    }

    pub async fn load_player_state(&self) -> Result<Option<PlayerState>> {
        let path = self.file_path(PLAYER_STATE_FILE);
        match fs::read_to_string(&path).await {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(state) => Ok(Some(state)),
                Err(e) => {
                    error!("Error restoring player state: {}", e);
                    Ok(None)
                }
            },
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).context("Error reading player state"),
        }
    }

    pub async fn save_player_state(&self, state: &PlayerState) -> Result<()> {
        let content = serde_json::to_string(state)?;
        fs::write(self.file_path(PLAYER_STATE_FILE), content)
            .await
            .context("Error saving player state")?;
        Ok(())
    }

    /// Borra el estado guardado del reproductor; no falla si no existe.
    pub async fn clear_player_state(&self) -> Result<()> {
        match fs::remove_file(self.file_path(PLAYER_STATE_FILE)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).context("Error clearing player state"),
        }
    }

    /// Obtiene estadísticas de almacenamiento
    pub async fn stats(&self) -> Result<StorageStats> {
        let mut files = fs::read_dir(&self.data_dir).await?;
        let mut file_count = 0;
        let mut total_size = 0;

        while let Some(entry) = files.next_entry().await? {
            if entry.path().extension().map_or(false, |ext| ext == "json") {
                file_count += 1;
                if let Ok(metadata) = entry.metadata().await {
                    total_size += metadata.len();
                }
            }
        }

        Ok(StorageStats {
            files: file_count,
            total_size_bytes: total_size,
            data_dir: self.data_dir.clone(),
        })
    }

    fn file_path(&self, name: &str) -> PathBuf {
        self.data_dir.join(name)
    }
}

/// Estadísticas de almacenamiento
#[derive(Debug)]
pub struct StorageStats {
    pub files: usize,
    pub total_size_bytes: u64,
    pub data_dir: PathBuf,
}

impl std::fmt::Display for StorageStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "📊 Storage Stats:\n\
             📁 Data Directory: {}\n\
             📝 Files: {}\n\
             📦 Total Size: {} bytes ({:.2} KB)",
            self.data_dir.display(),
            self.files,
            self.total_size_bytes,
            self.total_size_bytes as f64 / 1024.0
        )
    }
}
