use thiserror::Error;

/// Errores del pipeline de feeds (fetch, parseo y biblioteca).
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("Invalid feed URL")]
    InvalidUrl,

    #[error("Feed request timed out. The server might be down or responding too slowly.")]
    Timeout,

    #[error("Failed to fetch feed: {status}")]
    Http { status: String },

    #[error("Failed to fetch feed: {0}")]
    Transport(String),

    #[error("Invalid feed format: not a valid JSON structure")]
    InvalidJson,

    #[error("Invalid RSS feed format: {0}")]
    InvalidXml(String),

    #[error("Invalid RSS feed format: Invalid RSS feed: no channel element found")]
    NoChannel,

    #[error("URL does not appear to be a valid feed")]
    NotAFeed,

    #[error("This feed is already in your library")]
    AlreadyExists,

    #[error("Feed not found or missing URL")]
    NotFound,

    #[error("Only custom feeds can be refreshed")]
    NotRefreshable,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for FeedError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FeedError::Timeout
        } else if let Some(status) = err.status() {
            FeedError::Http {
                status: status.to_string(),
            }
        } else {
            FeedError::Transport(err.to_string())
        }
    }
}

pub type FeedResult<T> = Result<T, FeedError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_match_player_notices() {
        assert_eq!(
            FeedError::AlreadyExists.to_string(),
            "This feed is already in your library"
        );
        assert_eq!(
            FeedError::InvalidJson.to_string(),
            "Invalid feed format: not a valid JSON structure"
        );
        assert!(FeedError::Timeout.to_string().contains("timed out"));
    }

    #[tokio::test]
    async fn test_reqwest_timeout_maps_to_timeout() {
        // acepta la conexión pero nunca responde
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(100))
            .build()
            .unwrap();
        let err = client
            .get(format!("http://{}/rss", addr))
            .send()
            .await
            .unwrap_err();

        assert!(matches!(FeedError::from(err), FeedError::Timeout));
        drop(listener);
    }

    #[test]
    fn test_io_errors_convert() {
        let err: FeedError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(matches!(err, FeedError::Io(_)));
    }
}
