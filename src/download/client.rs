//! HTTP client wrapper for fetching resolved media.
//!
//! This module provides the `HttpClient` struct which fetches videos, audio
//! sources, and slideshow images either into memory or streamed to disk.

use std::path::Path;
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::Client;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info, instrument};
use url::Url;

use super::constants::{CONNECT_TIMEOUT_SECS, MAX_PREALLOC_BYTES, READ_TIMEOUT_SECS};
use super::error::DownloadError;
use crate::user_agent;

/// HTTP client for media transfers.
///
/// Create once and clone freely; clones share the connection pool.
///
/// # Example
///
/// ```no_run
/// use tikgrab_core::download::HttpClient;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = HttpClient::new()?;
/// let bytes = client
///     .download_to_path("https://cdn.example/v.mp4", Path::new("./v.mp4"))
///     .await?;
/// println!("wrote {bytes} bytes");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Creates a client with the default timeouts (30s connect, 5min read).
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::ClientBuild`] if the TLS backend fails to initialize.
    pub fn new() -> Result<Self, DownloadError> {
        Self::new_with_timeouts(CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS)
    }

    /// Creates a client with explicit timeout values.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::ClientBuild`] if the TLS backend fails to initialize.
    pub fn new_with_timeouts(
        connect_timeout_secs: u64,
        read_timeout_secs: u64,
    ) -> Result<Self, DownloadError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(connect_timeout_secs))
            .timeout(Duration::from_secs(read_timeout_secs))
            .gzip(true)
            .user_agent(user_agent::default_download_user_agent())
            .build()
            .map_err(|source| DownloadError::ClientBuild { source })?;
        Ok(Self { client })
    }

    /// Fetches a locator fully into memory.
    ///
    /// # Errors
    ///
    /// Returns `DownloadError` if the URL is invalid, the request fails or
    /// times out, the server answers with a non-success status, or the body
    /// stream breaks midway.
    #[instrument(skip(self), fields(url = %url))]
    pub async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, DownloadError> {
        let response = self.send_request(url).await?;
        let hint = response
            .content_length()
            .and_then(|len| usize::try_from(len).ok())
            .unwrap_or(0);
        let mut body = Vec::with_capacity(hint.min(MAX_PREALLOC_BYTES));
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| DownloadError::network(url, e))?;
            body.extend_from_slice(&chunk);
        }
        debug!(bytes = body.len(), "fetched into memory");
        Ok(body)
    }

    /// Streams a locator to `path`, returning the number of bytes written.
    ///
    /// A partially written file is removed when the transfer fails.
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`fetch_bytes`](Self::fetch_bytes), plus
    /// [`DownloadError::Io`] when the file cannot be created or written.
    #[instrument(skip(self), fields(url = %url, path = %path.display()))]
    pub async fn download_to_path(&self, url: &str, path: &Path) -> Result<u64, DownloadError> {
        let response = self.send_request(url).await?;

        let mut file = File::create(path)
            .await
            .map_err(|e| DownloadError::io(path, e))?;

        let stream_result = stream_to_file(&mut file, response, url, path).await;
        if stream_result.is_err() {
            debug!("cleaning up partial file after error");
            let _ = tokio::fs::remove_file(path).await;
        }
        let bytes_written = stream_result?;

        info!(bytes = bytes_written, "download complete");
        Ok(bytes_written)
    }

    async fn send_request(&self, url: &str) -> Result<reqwest::Response, DownloadError> {
        let parsed = Url::parse(url).map_err(|_| DownloadError::invalid_url(url))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(DownloadError::invalid_url(url));
        }

        let response = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(|e| DownloadError::network(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::http_status(url, status.as_u16()));
        }
        Ok(response)
    }
}

/// Streams response body to file, returning bytes written.
///
/// Split out so the caller can clean up on error.
async fn stream_to_file(
    file: &mut File,
    response: reqwest::Response,
    url: &str,
    file_path: &Path,
) -> Result<u64, DownloadError> {
    let mut writer = BufWriter::new(file);
    let mut stream = response.bytes_stream();
    let mut bytes_written: u64 = 0;

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.map_err(|e| DownloadError::network(url, e))?;

        writer
            .write_all(&chunk)
            .await
            .map_err(|e| DownloadError::io(file_path, e))?;

        bytes_written += chunk.len() as u64;
    }

    writer
        .flush()
        .await
        .map_err(|e| DownloadError::io(file_path, e))?;

    Ok(bytes_written)
}
