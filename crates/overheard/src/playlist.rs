//! Resolution of `.m3u` / `.pls` playlist references to a direct stream address.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;
use url::Url;

use crate::error::PlaylistError;

const PLAYLIST_EXTENSIONS: [&str; 2] = [".m3u", ".pls"];

/// Upper bound for fetching a playlist body.
pub const DEFAULT_PLAYLIST_TIMEOUT: Duration = Duration::from_secs(30);

/// Whether `stream_url` points at a playlist rather than at the stream itself.
pub fn is_playlist(stream_url: &str) -> bool {
    let path = match Url::parse(stream_url) {
        Ok(url) => url.path().to_ascii_lowercase(),
        Err(_) => stream_url
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase(),
    };
    PLAYLIST_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}

/// Extract the first stream address from a playlist body.
///
/// Bare `http...` lines (M3U) and `File1=` entries (PLS) are recognised,
/// whichever comes first.
pub fn parse_playlist(body: &str) -> Result<String, PlaylistError> {
    for line in body.lines().map(str::trim) {
        if line.starts_with("http") {
            return Ok(line.to_string());
        }
        if line.to_ascii_lowercase().starts_with("file1=")
            && let Some((_, address)) = line.split_once('=')
        {
            return Ok(address.trim().to_string());
        }
    }
    Err(PlaylistError::Format)
}

/// Maps an indirect stream reference to a direct stream address.
#[async_trait]
pub trait PlaylistResolver: Send + Sync {
    async fn resolve(&self, playlist_url: &str) -> Result<String, PlaylistError>;
}

/// Fetches the playlist over HTTP and scans it with [`parse_playlist`].
#[derive(Debug, Clone)]
pub struct HttpPlaylistResolver {
    client: Client,
    timeout: Duration,
}

impl HttpPlaylistResolver {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            timeout: DEFAULT_PLAYLIST_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl PlaylistResolver for HttpPlaylistResolver {
    async fn resolve(&self, playlist_url: &str) -> Result<String, PlaylistError> {
        let fetch_error = |source| PlaylistError::Fetch {
            url: playlist_url.to_string(),
            source,
        };

        let response = self
            .client
            .get(playlist_url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(fetch_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(PlaylistError::Status {
                url: playlist_url.to_string(),
                status,
            });
        }

        let body = response.text().await.map_err(fetch_error)?;
        let stream_url = parse_playlist(&body)?;
        debug!(playlist = %playlist_url, stream_url = %stream_url, "Resolved playlist");
        Ok(stream_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_playlist_extensions() {
        assert!(is_playlist("http://radio.example/live.pls"));
        assert!(is_playlist("http://radio.example/live.m3u"));
        assert!(is_playlist("http://radio.example/LIVE.PLS?token=abc"));
        assert!(!is_playlist("http://radio.example/live.mp3"));
        assert!(!is_playlist("http://radio.example/stream"));
        assert!(!is_playlist("http://radio.example/stream?format=.pls"));
    }

    #[test]
    fn test_pls_file1_entry() {
        let body = "File1=http://a.example/stream";
        assert_eq!(parse_playlist(body).unwrap(), "http://a.example/stream");
    }

    #[test]
    fn test_pls_with_header() {
        let body = "[playlist]\nNumberOfEntries=2\nfile1=http://a.example/one\nFile2=http://a.example/two\nTitle1=Radio\n";
        assert_eq!(parse_playlist(body).unwrap(), "http://a.example/one");
    }

    #[test]
    fn test_m3u_first_http_line_wins() {
        let body = "#EXTM3U\n#EXTINF:-1,Radio\n  http://a.example/first  \nhttp://a.example/second\n";
        assert_eq!(parse_playlist(body).unwrap(), "http://a.example/first");
    }

    #[test]
    fn test_crlf_line_endings() {
        let body = "[playlist]\r\nFile1=http://a.example/stream\r\n";
        assert_eq!(parse_playlist(body).unwrap(), "http://a.example/stream");
    }

    #[test]
    fn test_no_address_is_format_error() {
        assert!(matches!(
            parse_playlist("[playlist]\nNumberOfEntries=0\n"),
            Err(PlaylistError::Format)
        ));
        assert!(matches!(parse_playlist(""), Err(PlaylistError::Format)));
    }
}
