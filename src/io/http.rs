use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use reqwest::header::RANGE;
use reqwest::{Client, Response, StatusCode};
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

use super::{ArchiveLocator, ChunkStream, RangeSource};
use anyhow::{Result, bail};

type UrlBuilder = Box<dyn Fn(&ArchiveLocator) -> String + Send + Sync>;

/// Tunables for [`HttpRangeSource`]
#[derive(Debug, Clone)]
pub struct HttpSourceConfig {
    /// Timeout applied to every request
    pub request_timeout: Duration,
    /// Attempts before a connect or timeout error is returned
    pub max_retry: u32,
    /// Backoff step; the n-th retry waits `n * retry_backoff`
    pub retry_backoff: Duration,
}

impl Default for HttpSourceConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            max_retry: 10,
            retry_backoff: Duration::from_millis(500),
        }
    }
}

impl HttpSourceConfig {
    /// Build a configuration from `RANGEZIP_*` environment variables.
    ///
    /// Missing or unparseable values keep their defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            request_timeout: env_parse("RANGEZIP_REQUEST_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.request_timeout),
            max_retry: env_parse("RANGEZIP_MAX_RETRY").unwrap_or(defaults.max_retry),
            retry_backoff: env_parse("RANGEZIP_RETRY_BACKOFF_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.retry_backoff),
        }
    }
}

fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok()?.trim().parse().ok()
}

/// HTTP Range source for objects in S3 or any Range-capable server
pub struct HttpRangeSource {
    client: Client,
    url_for: UrlBuilder,
    config: HttpSourceConfig,
    transferred_bytes: Arc<AtomicU64>,
}

impl HttpRangeSource {
    /// Create a source addressing objects as `https://{bucket}.s3.amazonaws.com/{key}`
    pub fn new(config: HttpSourceConfig) -> Result<Self> {
        Self::with_url_builder(config, |locator: &ArchiveLocator| {
            format!("https://{}.s3.amazonaws.com/{}", locator.bucket, locator.key)
        })
    }

    /// Create a source addressing objects as `{base}{bucket}/{key}`
    pub fn with_base_url(config: HttpSourceConfig, base: impl Into<String>) -> Result<Self> {
        let mut base = base.into();
        if !base.ends_with('/') {
            base.push('/');
        }
        Self::with_url_builder(config, move |locator: &ArchiveLocator| {
            format!("{}{}/{}", base, locator.bucket, locator.key)
        })
    }

    /// Create a source with a custom locator to URL mapping
    pub fn with_url_builder<F>(config: HttpSourceConfig, url_for: F) -> Result<Self>
    where
        F: Fn(&ArchiveLocator) -> String + Send + Sync + 'static,
    {
        let client = Client::builder().timeout(config.request_timeout).build()?;

        Ok(Self {
            client,
            url_for: Box::new(url_for),
            config,
            transferred_bytes: Arc::new(AtomicU64::new(0)),
        })
    }

    /// URL requested for `locator`
    pub fn url(&self, locator: &ArchiveLocator) -> String {
        (self.url_for)(locator)
    }

    /// Get total bytes transferred from network
    pub fn transferred_bytes(&self) -> u64 {
        self.transferred_bytes.load(Ordering::Relaxed)
    }

    /// Send a Range request, retrying connection failures and timeouts
    async fn send_range(&self, url: &str, range: &str) -> Result<Response> {
        let mut retry_count = 0;

        loop {
            debug!(url, range, "sending range request");
            let result = self.client.get(url).header(RANGE, range).send().await;

            match result {
                Ok(resp) => {
                    if resp.status() != StatusCode::PARTIAL_CONTENT {
                        bail!("HTTP request failed with status: {}", resp.status());
                    }
                    return Ok(resp);
                }
                Err(e) if e.is_timeout() || e.is_connect() => {
                    retry_count += 1;
                    if retry_count >= self.config.max_retry {
                        bail!("Max retries exceeded: {e}");
                    }
                    warn!(
                        retry = retry_count,
                        max_retry = self.config.max_retry,
                        error = %e,
                        "connection error, retrying"
                    );
                    tokio::time::sleep(self.config.retry_backoff * retry_count).await;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

#[async_trait]
impl RangeSource for HttpRangeSource {
    async fn fetch_range(&self, locator: &ArchiveLocator, start: u64, end: u64) -> Result<Bytes> {
        if start > end {
            bail!("Invalid byte range {start}-{end}");
        }

        let url = self.url(locator);
        let expected_size = (end - start + 1) as usize;
        let mut buf = BytesMut::with_capacity(expected_size);

        // Servers may cut a response short; ask again for whatever is missing.
        while buf.len() < expected_size {
            let current_start = start + buf.len() as u64;
            let range = format!("bytes={}-{}", current_start, end);

            let resp = self.send_range(&url, &range).await?;
            let bytes = resp.bytes().await?;
            if bytes.is_empty() {
                bail!(
                    "Server returned no data for {range} ({} of {expected_size} bytes received)",
                    buf.len()
                );
            }

            let chunk_len = bytes.len().min(expected_size - buf.len());
            buf.extend_from_slice(&bytes[..chunk_len]);

            self.transferred_bytes
                .fetch_add(chunk_len as u64, Ordering::Relaxed);
        }

        Ok(buf.freeze())
    }

    async fn fetch_last_bytes(&self, locator: &ArchiveLocator, count: u64) -> Result<Bytes> {
        if count == 0 {
            return Ok(Bytes::new());
        }

        let url = self.url(locator);
        let resp = self.send_range(&url, &format!("bytes=-{count}")).await?;
        let bytes = resp.bytes().await?;

        self.transferred_bytes
            .fetch_add(bytes.len() as u64, Ordering::Relaxed);

        Ok(bytes)
    }

    async fn stream_range(
        &self,
        locator: &ArchiveLocator,
        start: u64,
        end: u64,
    ) -> Result<Box<dyn ChunkStream>> {
        if start > end {
            bail!("Invalid byte range {start}-{end}");
        }

        let url = self.url(locator);
        let response = self
            .send_range(&url, &format!("bytes={}-{}", start, end))
            .await?;

        Ok(Box::new(HttpChunks {
            content_length: response.content_length(),
            response,
            transferred_bytes: Arc::clone(&self.transferred_bytes),
        }))
    }
}

/// Body of a single Range response, read chunk by chunk
struct HttpChunks {
    response: Response,
    content_length: Option<u64>,
    transferred_bytes: Arc<AtomicU64>,
}

#[async_trait]
impl ChunkStream for HttpChunks {
    fn content_length(&self) -> Option<u64> {
        self.content_length
    }

    async fn next_chunk(&mut self) -> Result<Option<Bytes>> {
        let chunk = self.response.chunk().await?;
        if let Some(ref bytes) = chunk {
            self.transferred_bytes
                .fetch_add(bytes.len() as u64, Ordering::Relaxed);
        }
        Ok(chunk)
    }
}
