use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};

use crate::sources::CorsProxy;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    // Feeds
    pub default_feeds: String,
    pub cors_proxy: CorsProxy,
    pub local_hosts: Vec<String>,
    pub fetch_timeout: Duration,

    // Caché
    pub cache_ttl: Duration,      // frescura de feeds custom
    pub body_cache_ttl: Duration, // cuerpos HTTP en memoria

    // Reproductor
    pub player_command: Vec<String>,
    pub autoplay: bool,
    pub persist_state: bool,

    // Paths
    pub data_dir: PathBuf,
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();
        let config = Self {
            default_feeds: env_or("DEFAULT_FEEDS", &defaults.default_feeds),
            cors_proxy: match std::env::var("CORS_PROXY") {
                Ok(val) => val.parse()?,
                Err(_) => defaults.cors_proxy,
            },
            local_hosts: match std::env::var("LOCAL_HOSTS") {
                Ok(val) => split_list(&val, ','),
                Err(_) => defaults.local_hosts,
            },
            fetch_timeout: env_duration("FETCH_TIMEOUT", defaults.fetch_timeout)?,

            cache_ttl: env_duration("CACHE_TTL", defaults.cache_ttl)?,
            body_cache_ttl: env_duration("BODY_CACHE_TTL", defaults.body_cache_ttl)?,

            player_command: match std::env::var("PLAYER_COMMAND") {
                Ok(val) => split_list(&val, ' '),
                Err(_) => defaults.player_command,
            },
            autoplay: env_or("AUTOPLAY", "false")
                .parse()
                .context("AUTOPLAY must be true or false")?,
            persist_state: env_or("PERSIST_STATE", "true")
                .parse()
                .context("PERSIST_STATE must be true or false")?,

            data_dir: env_or("DATA_DIR", "./data").into(),
        };

        std::fs::create_dir_all(&config.data_dir)
            .with_context(|| format!("Cannot create data dir {}", config.data_dir.display()))?;

        config.validate()?;

        Ok(config)
    }

    /// Validates configuration values for correctness.
    ///
    /// # Validation Rules
    ///
    /// - Fetch timeout and cache TTL must be greater than zero
    /// - The player command must name an executable
    pub fn validate(&self) -> Result<()> {
        if self.fetch_timeout.is_zero() {
            anyhow::bail!("Fetch timeout must be greater than 0");
        }

        if self.cache_ttl.is_zero() {
            anyhow::bail!("Cache TTL must be greater than 0");
        }

        if self.player_command.is_empty() {
            anyhow::bail!("Player command cannot be empty");
        }

        Ok(())
    }

    /// Returns a summary of the current configuration for logging.
    pub fn summary(&self) -> String {
        format!(
            "Config Summary:\n  \
            Feeds: defaults from {}, proxy {}, timeout {}\n  \
            Cache: feeds {}, bodies {}\n  \
            Player: `{}` (autoplay={}, persist={})\n  \
            Data: {}",
            self.default_feeds,
            self.cors_proxy,
            humantime::format_duration(self.fetch_timeout),
            humantime::format_duration(self.cache_ttl),
            humantime::format_duration(self.body_cache_ttl),
            self.player_command.join(" "),
            self.autoplay,
            self.persist_state,
            self.data_dir.display(),
        )
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_feeds: "feed.json".to_string(),
            cors_proxy: CorsProxy::default(),
            local_hosts: vec!["localhost".to_string(), "127.0.0.1".to_string()],
            fetch_timeout: Duration::from_secs(15),

            cache_ttl: Duration::from_secs(60 * 60), // 1 hora
            body_cache_ttl: Duration::from_secs(5 * 60),

            player_command: vec![
                "mpv".to_string(),
                "--no-video".to_string(),
                "--really-quiet".to_string(),
            ],
            autoplay: false,
            persist_state: true,

            data_dir: "./data".into(),
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_duration(key: &str, default: Duration) -> Result<Duration> {
    match std::env::var(key) {
        Ok(val) if !val.trim().is_empty() => humantime::parse_duration(val.trim())
            .with_context(|| format!("{} must be a duration like 15s or 1h, got: {}", key, val)),
        _ => Ok(default),
    }
}

fn split_list(raw: &str, separator: char) -> Vec<String> {
    raw.split(separator)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.cache_ttl, Duration::from_secs(3600));
        assert_eq!(config.fetch_timeout, Duration::from_secs(15));
        assert!(config.summary().contains("corsproxy.io"));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = Config {
            fetch_timeout: Duration::ZERO,
            ..Config::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            player_command: Vec::new(),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_split_list() {
        assert_eq!(split_list("localhost, 127.0.0.1,,", ','), vec!["localhost", "127.0.0.1"]);
        assert_eq!(split_list("mpv  --no-video", ' '), vec!["mpv", "--no-video"]);
    }
}
