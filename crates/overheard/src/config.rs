use std::time::Duration;

use reqwest::Client;
use reqwest::header::{HeaderMap, HeaderValue};
use tracing::debug;

pub const DEFAULT_USER_AGENT: &str = concat!("overheard/", env!("CARGO_PKG_VERSION"));

/// HTTP options shared by stream captures and playlist lookups.
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Time allowed to establish a connection.
    ///
    /// The capture window itself is enforced per request, so the client has
    /// no overall request timeout.
    pub connect_timeout: Duration,

    /// Whether to follow redirects
    pub follow_redirects: bool,

    /// User agent string
    pub user_agent: String,

    /// Extra headers merged over the defaults
    pub headers: HeaderMap,

    /// Write buffer in front of the output file
    pub write_buffer_size: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            follow_redirects: true,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            headers: HeaderMap::new(),
            write_buffer_size: 64 * 1024,
        }
    }
}

impl CaptureConfig {
    pub fn get_default_headers() -> HeaderMap {
        let mut default_headers = HeaderMap::new();

        default_headers.insert(reqwest::header::ACCEPT, HeaderValue::from_static("*/*"));

        // Ask shoutcast/icecast servers for plain audio without interleaved metadata.
        default_headers.insert("icy-metadata", HeaderValue::from_static("0"));

        default_headers
    }
}

/// Build the HTTP client used for every job in a run.
pub fn create_client(config: &CaptureConfig) -> Result<Client, reqwest::Error> {
    let mut headers = CaptureConfig::get_default_headers();
    for (name, value) in config.headers.iter() {
        headers.insert(name.clone(), value.clone());
    }

    let mut client_builder = Client::builder()
        .user_agent(&config.user_agent)
        .default_headers(headers)
        .redirect(if config.follow_redirects {
            reqwest::redirect::Policy::limited(10)
        } else {
            reqwest::redirect::Policy::none()
        });

    if !config.connect_timeout.is_zero() {
        client_builder = client_builder.connect_timeout(config.connect_timeout);
    }

    debug!(user_agent = %config.user_agent, "Building capture HTTP client");
    client_builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_custom_headers_override_defaults() {
        let mut config = CaptureConfig::default();
        config
            .headers
            .insert(reqwest::header::ACCEPT, HeaderValue::from_static("audio/*"));

        assert!(create_client(&config).is_ok());
        assert_eq!(config.write_buffer_size, 64 * 1024);
        assert!(CaptureConfig::get_default_headers().contains_key("icy-metadata"));
    }
}
