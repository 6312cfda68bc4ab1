use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Relay usado para feeds de otros dominios.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CorsProxy {
    CorsproxyIo,
    AllOrigins,
    /// Prefijo arbitrario; la URL codificada se concatena al final.
    Custom(String),
    Disabled,
}

impl CorsProxy {
    /// Envuelve la URL de destino en el relay.
    pub fn wrap(&self, url: &str) -> String {
        let encoded = urlencoding::encode(url);
        match self {
            CorsProxy::CorsproxyIo => format!("https://corsproxy.io/?{}", encoded),
            CorsProxy::AllOrigins => format!("https://api.allorigins.win/raw?url={}", encoded),
            CorsProxy::Custom(prefix) => format!("{}{}", prefix, encoded),
            CorsProxy::Disabled => url.to_string(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        !matches!(self, CorsProxy::Disabled)
    }
}

impl Default for CorsProxy {
    fn default() -> Self {
        CorsProxy::CorsproxyIo
    }
}

impl FromStr for CorsProxy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "corsproxy" | "corsproxy.io" => Ok(CorsProxy::CorsproxyIo),
            "allorigins" | "allorigins.win" => Ok(CorsProxy::AllOrigins),
            "none" | "off" | "disabled" => Ok(CorsProxy::Disabled),
            _ => {
                let prefix = s.trim();
                if !(prefix.starts_with("http://") || prefix.starts_with("https://")) {
                    anyhow::bail!("CORS proxy must be a known name or an http(s) prefix, got: {}", prefix);
                }
                if !(prefix.ends_with('=') || prefix.ends_with('?')) {
                    anyhow::bail!("Custom CORS proxy prefix must end with '=' or '?', got: {}", prefix);
                }
                Ok(CorsProxy::Custom(prefix.to_string()))
            }
        }
    }
}

impl fmt::Display for CorsProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CorsProxy::CorsproxyIo => write!(f, "corsproxy.io"),
            CorsProxy::AllOrigins => write!(f, "allorigins.win"),
            CorsProxy::Custom(prefix) => write!(f, "{}", prefix),
            CorsProxy::Disabled => write!(f, "disabled"),
        }
    }
}

/// Una URL es remota si es http(s) y su host no está en la lista local.
pub fn is_remote(url: &str, local_hosts: &[String]) -> bool {
    if !url.starts_with("http") {
        return false;
    }
    match url::Url::parse(url) {
        Ok(parsed) => parsed
            .host_str()
            .map_or(true, |host| !local_hosts.iter().any(|local| local.eq_ignore_ascii_case(host))),
        Err(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap() {
        let url = "https://example.com/rss?a=1&b=2";
        assert_eq!(
            CorsProxy::CorsproxyIo.wrap(url),
            "https://corsproxy.io/?https%3A%2F%2Fexample.com%2Frss%3Fa%3D1%26b%3D2"
        );
        assert!(CorsProxy::AllOrigins
            .wrap(url)
            .starts_with("https://api.allorigins.win/raw?url=https%3A%2F%2F"));
        assert_eq!(CorsProxy::Disabled.wrap(url), url);
    }

    #[test]
    fn test_from_str() {
        assert_eq!("corsproxy".parse::<CorsProxy>().unwrap(), CorsProxy::CorsproxyIo);
        assert_eq!("NONE".parse::<CorsProxy>().unwrap(), CorsProxy::Disabled);
        assert_eq!(
            "https://relay.example.com/?u=".parse::<CorsProxy>().unwrap(),
            CorsProxy::Custom("https://relay.example.com/?u=".to_string())
        );
        assert!("relay".parse::<CorsProxy>().is_err());
        assert!("https://relay.example.com/".parse::<CorsProxy>().is_err());
    }

    #[test]
    fn test_is_remote() {
        let local = vec!["localhost".to_string(), "127.0.0.1".to_string()];
        assert!(is_remote("https://example.com/feed.xml", &local));
        assert!(!is_remote("http://localhost:8080/feed.json", &local));
        assert!(!is_remote("http://127.0.0.1/feed.json", &local));
        assert!(!is_remote("feed.json", &local));
        assert!(!is_remote("./data/palm-springs-feed.json", &local));
    }
}
