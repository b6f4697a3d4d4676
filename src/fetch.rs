//! Page fetching with bounded retry.
//!
//! All network I/O goes through this module:
//! - [`PageSource`]: core trait, fetch a URL and return its body as text
//! - [`HttpPageSource`]: `reqwest` implementation with a pooled client
//! - [`RetryFetch`]: decorator that retries any [`PageSource`]
//!
//! # Retry Strategy
//!
//! A failed attempt (transport error or non-success status) is retried up to
//! `max_retries` more times. Each retry is preceded by a fixed pause of twice
//! the configured request delay. Once retries are exhausted the last error is
//! returned and the caller skips the URL.

use crate::config::ScraperConfig;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use reqwest::{Client, StatusCode};
use std::fmt;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::time::sleep;
use tracing::{error, info, instrument, warn};

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("HTTP status {0}")]
    Status(StatusCode),

    #[error("invalid header {name:?}: {reason}")]
    Header { name: String, reason: String },

    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted {
        attempts: u32,
        #[source]
        last: Box<FetchError>,
    },
}

/// Something that can turn a URL into page text.
pub trait PageSource {
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

/// Fetches pages over HTTP(S) with a shared keep-alive client.
#[derive(Debug, Clone)]
pub struct HttpPageSource {
    client: Client,
}

impl HttpPageSource {
    /// Build a client with the configured timeout, user agent and headers.
    ///
    /// The client pools connections, so consecutive requests to the same
    /// host reuse a keep-alive socket. Compression is negotiated by `reqwest`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Header`] if a configured header name or value is
    /// not valid HTTP, or [`FetchError::Transport`] if the client cannot be
    /// built.
    pub fn new(config: &ScraperConfig) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        for (name, value) in &config.headers {
            let header_name =
                HeaderName::from_bytes(name.as_bytes()).map_err(|e| FetchError::Header {
                    name: name.clone(),
                    reason: e.to_string(),
                })?;
            let header_value = HeaderValue::from_str(value).map_err(|e| FetchError::Header {
                name: name.clone(),
                reason: e.to_string(),
            })?;
            headers.insert(header_name, header_value);
        }
        let user_agent =
            HeaderValue::from_str(&config.user_agent).map_err(|e| FetchError::Header {
                name: USER_AGENT.to_string(),
                reason: e.to_string(),
            })?;
        headers.insert(USER_AGENT, user_agent);

        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self { client })
    }
}

impl PageSource for HttpPageSource {
    #[instrument(level = "debug", skip(self))]
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }
        let bytes = response.bytes().await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// Wraps a [`PageSource`] with bounded retry.
///
/// The pause before every retry is `delay * 2`; it does not grow with the
/// attempt number.
pub struct RetryFetch<T> {
    inner: T,
    max_retries: u32,
    delay: Duration,
}

impl<T> RetryFetch<T>
where
    T: PageSource,
{
    /// Create a retry wrapper around an existing [`PageSource`].
    ///
    /// # Arguments
    ///
    /// * `inner` - The source performing each individual attempt
    /// * `max_retries` - Attempts allowed after the first failure
    /// * `delay` - Base request delay; each retry waits twice this long
    ///
    /// # Example
    ///
    /// ```ignore
    /// let source = HttpPageSource::new(&config)?;
    /// let fetcher = RetryFetch::new(source, 3, Duration::from_secs(2));
    /// ```
    pub fn new(inner: T, max_retries: u32, delay: Duration) -> Self {
        Self {
            inner,
            max_retries,
            delay,
        }
    }

    pub fn from_config(inner: T, config: &ScraperConfig) -> Self {
        Self::new(inner, config.max_retries, config.request_delay())
    }

    #[cfg(test)]
    pub fn inner(&self) -> &T {
        &self.inner
    }
}

impl<T> fmt::Debug for RetryFetch<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryFetch")
            .field("max_retries", &self.max_retries)
            .field("delay", &self.delay)
            .finish()
    }
}

impl<T> PageSource for RetryFetch<T>
where
    T: PageSource,
{
    /// Fetch `url`, retrying failed attempts.
    ///
    /// # Returns
    ///
    /// The page body from the first successful attempt.
    ///
    /// # Errors
    ///
    /// [`FetchError::Exhausted`] wrapping the last attempt's error once
    /// `max_retries` retries have failed.
    #[instrument(level = "info", skip(self))]
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let total_t0 = Instant::now();
        let mut attempt = 0u32;

        loop {
            info!(attempt, "Fetching");
            match self.inner.fetch(url).await {
                Ok(body) => return Ok(body),
                Err(e) => {
                    if attempt >= self.max_retries {
                        error!(
                            attempt,
                            max = self.max_retries,
                            elapsed_ms_total = total_t0.elapsed().as_millis(),
                            error = %e,
                            "fetch exhausted retries"
                        );
                        return Err(FetchError::Exhausted {
                            attempts: attempt + 1,
                            last: Box::new(e),
                        });
                    }

                    attempt += 1;
                    let backoff = self.delay * 2;
                    warn!(
                        attempt,
                        max = self.max_retries,
                        ?backoff,
                        error = %e,
                        "fetch failed; retrying"
                    );
                    sleep(backoff).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Fails the first `failures` calls, then succeeds.
    struct Flaky {
        failures: u32,
        calls: AtomicU32,
    }

    impl Flaky {
        fn new(failures: u32) -> Self {
            Self {
                failures,
                calls: AtomicU32::new(0),
            }
        }
    }

    impl PageSource for Flaky {
        async fn fetch(&self, url: &str) -> Result<String, FetchError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                Err(FetchError::Status(StatusCode::SERVICE_UNAVAILABLE))
            } else {
                Ok("<html></html>".to_string())
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_always_failing_source_retries_max_times() {
        let delay = Duration::from_secs(2);
        let fetcher = RetryFetch::new(Flaky::new(u32::MAX), 3, delay);

        let t0 = tokio::time::Instant::now();
        let err = fetcher.fetch("https://example.com/a").await.unwrap_err();
        let waited = t0.elapsed();

        assert_eq!(fetcher.inner().calls.load(Ordering::SeqCst), 4);
        assert!(matches!(err, FetchError::Exhausted { attempts: 4, .. }));
        // three retries, each after delay * 2
        assert!(waited >= Duration::from_secs(12));
        assert!(waited < Duration::from_secs(13));
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_after_transient_failures() {
        let fetcher = RetryFetch::new(Flaky::new(2), 3, Duration::from_secs(1));

        let t0 = tokio::time::Instant::now();
        let body = fetcher.fetch("https://example.com/a").await.unwrap();

        assert_eq!(body, "<html></html>");
        assert_eq!(fetcher.inner().calls.load(Ordering::SeqCst), 3);
        assert!(t0.elapsed() >= Duration::from_secs(4));
    }

    #[tokio::test]
    async fn test_zero_retries_fails_once() {
        let fetcher = RetryFetch::new(Flaky::new(1), 0, Duration::ZERO);
        assert!(fetcher.fetch("https://example.com/a").await.is_err());
        assert_eq!(fetcher.inner().calls.load(Ordering::SeqCst), 1);
    }

    /// Serves `500` for `/broken` and a German HTML snippet for anything else.
    async fn spawn_local_site() -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                tokio::spawn(async move {
                    let mut request = Vec::new();
                    let mut chunk = [0u8; 1024];
                    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                        match stream.read(&mut chunk).await {
                            Ok(0) | Err(_) => return,
                            Ok(n) => request.extend_from_slice(&chunk[..n]),
                        }
                    }
                    let (status, body) = if request.starts_with(b"GET /broken ") {
                        ("500 Internal Server Error", "kaputt")
                    } else {
                        ("200 OK", "<p>Grüße aus Köln</p>")
                    };
                    let response = format!(
                        "HTTP/1.1 {status}\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                        body.len()
                    );
                    let _ = stream.write_all(response.as_bytes()).await;
                    let _ = stream.shutdown().await;
                });
            }
        });
        addr
    }

    #[tokio::test]
    async fn test_http_source_status_and_utf8_body() {
        let addr = spawn_local_site().await;
        let source = HttpPageSource::new(&ScraperConfig::default()).unwrap();

        let err = source
            .fetch(&format!("http://{addr}/broken"))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Status(s) if s == StatusCode::INTERNAL_SERVER_ERROR));

        let body = source
            .fetch(&format!("http://{addr}/politik/article1/x.html"))
            .await
            .unwrap();
        assert_eq!(body, "<p>Grüße aus Köln</p>");
    }

    #[tokio::test]
    async fn test_http_server_error_exhausts_retries() {
        let addr = spawn_local_site().await;
        let source = HttpPageSource::new(&ScraperConfig::default()).unwrap();
        let fetcher = RetryFetch::new(source, 2, Duration::ZERO);

        let err = fetcher
            .fetch(&format!("http://{addr}/broken"))
            .await
            .unwrap_err();
        match err {
            FetchError::Exhausted { attempts, last } => {
                assert_eq!(attempts, 3);
                assert!(matches!(*last, FetchError::Status(s) if s.as_u16() == 500));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_http_source_rejects_bad_header() {
        let mut config = ScraperConfig::default();
        config
            .headers
            .insert("Bad Header".to_string(), "x".to_string());
        let err = HttpPageSource::new(&config).unwrap_err();
        assert!(matches!(err, FetchError::Header { .. }));
    }

    #[test]
    fn test_http_source_builds_from_defaults() {
        assert!(HttpPageSource::new(&ScraperConfig::default()).is_ok());
    }
}
