use anyhow::{Context, Result};
use async_process::{Child, Command, Stdio};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Salida de audio real detrás de la sesión del reproductor.
#[async_trait]
pub trait PlaybackBackend: Send {
    /// Empieza a reproducir `url` desde `position` segundos a velocidad `rate`.
    async fn start(&mut self, url: &str, position: f64, rate: f64) -> Result<()>;

    async fn stop(&mut self) -> Result<()>;

    /// `true` cuando la reproducción terminó sola (fin del archivo).
    fn is_finished(&mut self) -> bool;
}

/// Reproduce mediante un programa externo (mpv por defecto).
pub struct ProcessBackend {
    command: Vec<String>,
    child: Option<Child>,
}

impl ProcessBackend {
    pub fn new(command: Vec<String>) -> Self {
        Self {
            command,
            child: None,
        }
    }

    fn is_mpv(&self) -> bool {
        self.command
            .first()
            .map_or(false, |program| program.rsplit('/').next() == Some("mpv"))
    }

    /// Argumentos completos para una reproducción.
    pub fn build_args(&self, url: &str, position: f64, rate: f64) -> Vec<String> {
        let mut args: Vec<String> = self.command.iter().skip(1).cloned().collect();
        if self.is_mpv() {
            if position > 0.0 {
                args.push(format!("--start=+{:.1}", position));
            }
            if (rate - 1.0).abs() > f64::EPSILON {
                args.push(format!("--speed={}", rate));
            }
        }
        args.push(url.to_string());
        args
    }

    /// Verifica que el programa configurado exista y responda.
    pub async fn health_check(&self) -> Result<()> {
        let program = self.command.first().context("Player command is empty")?;
        let output = Command::new(program)
            .arg("--version")
            .output()
            .await
            .with_context(|| format!("Cannot run {}", program))?;

        if !output.status.success() {
            anyhow::bail!("{} --version exited with {}", program, output.status);
        }
        Ok(())
    }
}

#[async_trait]
impl PlaybackBackend for ProcessBackend {
    async fn start(&mut self, url: &str, position: f64, rate: f64) -> Result<()> {
        self.stop().await?;

        let program = self.command.first().context("Player command is empty")?;
        let args = self.build_args(url, position, rate);
        debug!("Lanzando {} {:?}", program, args);

        let child = Command::new(program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Cannot start {}", program))?;

        info!("▶️ Reproduciendo con {}: {}", program, url);
        self.child = Some(child);
        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        if let Some(mut child) = self.child.take() {
            if let Err(e) = child.kill() {
                // ya terminó
                debug!("kill: {}", e);
            }
            if let Err(e) = child.status().await {
                warn!("⚠️ Error esperando al reproductor: {}", e);
            }
        }
        Ok(())
    }

    fn is_finished(&mut self) -> bool {
        match self.child.as_mut().map(|child| child.try_status()) {
            Some(Ok(Some(_))) => {
                self.child = None;
                true
            }
            _ => false,
        }
    }
}

/// Llamadas registradas por [`SilentBackend`].
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    Start { url: String, position: f64, rate: f64 },
    Stop,
}

/// Backend sin audio: solo registra las llamadas (dry-run y tests).
#[derive(Debug, Clone, Default)]
pub struct SilentBackend {
    calls: Arc<Mutex<Vec<BackendCall>>>,
    finished: Arc<Mutex<bool>>,
}

impl SilentBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        self.calls.lock().clone()
    }

    /// Simula que la pista llegó al final.
    pub fn finish(&self) {
        *self.finished.lock() = true;
    }
}

#[async_trait]
impl PlaybackBackend for SilentBackend {
    async fn start(&mut self, url: &str, position: f64, rate: f64) -> Result<()> {
        *self.finished.lock() = false;
        self.calls.lock().push(BackendCall::Start {
            url: url.to_string(),
            position,
            rate,
        });
        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        self.calls.lock().push(BackendCall::Stop);
        Ok(())
    }

    fn is_finished(&mut self) -> bool {
        std::mem::take(&mut *self.finished.lock())
    }
}
