//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients with the configured user agent and timeouts
//! - Round-robin rotation through a proxy list
//! - Retry logic for transient failures
//! - Error classification
//!
//! Retries live here and only here; the crawl driver never retries an item.

use crate::config::FetchConfig;
use crate::ConfigError;
use async_trait::async_trait;
use reqwest::{Client, Proxy};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use thiserror::Error;

/// Errors returned by a fetch after its retries are exhausted
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP {status}")]
    Status { status: u16, body: String },

    #[error("Request timeout")]
    Timeout,

    #[error("Network error: {0}")]
    Network(String),
}

impl FetchError {
    /// Server errors and timeouts are worth another attempt
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Status { status, .. } => *status >= 500,
            Self::Timeout => true,
            Self::Network(_) => false,
        }
    }

    /// Response body returned with the failure, if any
    pub fn body(&self) -> &str {
        match self {
            Self::Status { body, .. } => body,
            _ => "",
        }
    }
}

/// Source of page bodies
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetches `url` and returns its body
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

/// Reads a newline-delimited proxy list, ignoring blank lines
///
/// # Returns
///
/// * `Ok(Vec<String>)` - At least one proxy URL
/// * `Err(ConfigError)` - The file is unreadable or lists no proxies
pub fn load_proxies(path: &Path) -> Result<Vec<String>, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let proxies: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();

    if proxies.is_empty() {
        return Err(ConfigError::Validation(format!(
            "Proxy list {} is empty",
            path.display()
        )));
    }

    Ok(proxies)
}

/// Builds an HTTP client, optionally routed through a proxy
pub fn build_http_client(config: &FetchConfig, proxy: Option<&str>) -> Result<Client, reqwest::Error> {
    let mut builder = Client::builder()
        .user_agent(config.user_agent.as_str())
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true);

    if let Some(proxy) = proxy {
        builder = builder.proxy(Proxy::all(proxy)?);
    }

    builder.build()
}

/// Fetcher backed by `reqwest`, rotating through proxies
pub struct HttpFetcher {
    clients: Vec<Client>,
    next: AtomicUsize,
    max_retries: u32,
    retry_delay: Duration,
}

impl HttpFetcher {
    /// Creates a fetcher with one client per proxy, or a single direct client
    pub fn new(config: &FetchConfig, proxies: &[String]) -> Result<Self, reqwest::Error> {
        let clients = if proxies.is_empty() {
            vec![build_http_client(config, None)?]
        } else {
            proxies
                .iter()
                .map(|proxy| build_http_client(config, Some(proxy)))
                .collect::<Result<Vec<_>, _>>()?
        };

        Ok(Self {
            clients,
            next: AtomicUsize::new(0),
            max_retries: config.max_retries,
            retry_delay: Duration::from_millis(config.retry_delay_ms),
        })
    }

    /// Number of rotation slots (proxies, or one for direct access)
    pub fn rotation_size(&self) -> usize {
        self.clients.len()
    }

    fn next_client(&self) -> &Client {
        let slot = self.next.fetch_add(1, Ordering::Relaxed) % self.clients.len();
        &self.clients[slot]
    }

    async fn fetch_once(&self, url: &str) -> Result<String, FetchError> {
        let response = self.next_client().get(url).send().await.map_err(classify)?;
        let status = response.status();
        let body = response.text().await.map_err(classify)?;

        if status.is_success() {
            Ok(body)
        } else {
            Err(FetchError::Status {
                status: status.as_u16(),
                body,
            })
        }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    /// Fetches a URL with retry handling
    ///
    /// # Retry Logic
    ///
    /// | Condition | Action |
    /// |-----------|--------|
    /// | HTTP 2xx | Return body |
    /// | HTTP 5xx | Retry up to `max-retries` times, `retry-delay-ms` apart |
    /// | Timeout | Retry up to `max-retries` times, `retry-delay-ms` apart |
    /// | Other HTTP status | Fail immediately with the response body |
    /// | Connection/TLS error | Fail immediately |
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let mut attempt = 0;

        loop {
            match self.fetch_once(url).await {
                Ok(body) => return Ok(body),
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    attempt += 1;
                    tracing::debug!(
                        "Retrying {} after {} (attempt {}/{})",
                        url,
                        e,
                        attempt,
                        self.max_retries
                    );
                    tokio::time::sleep(self.retry_delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

fn classify(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout
    } else if err.is_connect() {
        FetchError::Network(format!("Connection failed: {}", err))
    } else {
        FetchError::Network(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn create_test_config() -> FetchConfig {
        FetchConfig {
            retry_delay_ms: 1,
            max_retries: 2,
            ..FetchConfig::default()
        }
    }

    #[test]
    fn test_build_http_client() {
        let config = create_test_config();
        assert!(build_http_client(&config, None).is_ok());
        assert!(build_http_client(&config, Some("http://127.0.0.1:3128")).is_ok());
    }

    #[test]
    fn test_proxy_rotation_slots() {
        let config = create_test_config();
        let proxies = vec![
            "http://10.0.0.1:3128".to_string(),
            "http://10.0.0.2:3128".to_string(),
        ];
        assert_eq!(HttpFetcher::new(&config, &proxies).unwrap().rotation_size(), 2);
        assert_eq!(HttpFetcher::new(&config, &[]).unwrap().rotation_size(), 1);
    }

    #[test]
    fn test_load_proxies() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "http://10.0.0.1:3128\n\n  http://10.0.0.2:3128  \n").unwrap();
        let proxies = load_proxies(file.path()).unwrap();
        assert_eq!(proxies, vec!["http://10.0.0.1:3128", "http://10.0.0.2:3128"]);
    }

    #[test]
    fn test_load_empty_proxy_list() {
        let file = NamedTempFile::new().unwrap();
        assert!(matches!(
            load_proxies(file.path()),
            Err(ConfigError::Validation(_))
        ));
        assert!(load_proxies(Path::new("/nonexistent/proxies.txt")).is_err());
    }

    #[test]
    fn test_retryable_classification() {
        let server_error = FetchError::Status {
            status: 503,
            body: String::new(),
        };
        let not_found = FetchError::Status {
            status: 404,
            body: "gone".to_string(),
        };
        assert!(server_error.is_retryable());
        assert!(!not_found.is_retryable());
        assert_eq!(not_found.body(), "gone");
        assert!(FetchError::Timeout.is_retryable());
    }

    #[tokio::test]
    async fn test_fetch_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/title/tt0000005/"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(&create_test_config(), &[]).unwrap();
        let body = fetcher
            .fetch(&format!("{}/title/tt0000005/", server.uri()))
            .await
            .unwrap();
        assert_eq!(body, "<html>ok</html>");
    }

    #[tokio::test]
    async fn test_fetch_not_found_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_string("missing"))
            .expect(1)
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(&create_test_config(), &[]).unwrap();
        let err = fetcher
            .fetch(&format!("{}/title/tt0000005/", server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 404, .. }));
        assert_eq!(err.body(), "missing");
    }

    #[tokio::test]
    async fn test_fetch_server_error_is_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .expect(3)
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(&create_test_config(), &[]).unwrap();
        let err = fetcher
            .fetch(&format!("{}/title/tt0000005/", server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 503, .. }));
    }
}
