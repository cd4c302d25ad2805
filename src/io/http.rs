//! Minimal HTTP payload fetcher.
//!
//! One GET per run: the response must announce its length, and the body is
//! streamed to the destination file chunk by chunk with a progress callback
//! after each chunk. Nothing here retries; a transport failure aborts the
//! pipeline with a code naming the phase that failed.

use std::error::Error as _;
use std::path::Path;
use std::time::Duration;

use reqwest::Client;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::error::{InstallError, Result};
use crate::ui::ProgressSink;

/// User agent announced to the payload server.
pub const USER_AGENT: &str = concat!("shopdl/", env!("CARGO_PKG_VERSION"));

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client wrapper that saves a payload to disk.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| InstallError::SocketCreateFailed(e.to_string()))?;
        Ok(Self { client })
    }

    /// Download `url` to `dest`, reporting progress after every chunk.
    ///
    /// A response without a Content-Length is a failed fetch, never a
    /// silent zero-length download, and a body shorter than announced is
    /// an interrupted one. Returns the number of bytes saved.
    pub async fn fetch_to_file(
        &self,
        url: &str,
        dest: &Path,
        progress: &mut dyn ProgressSink,
    ) -> Result<u64> {
        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(classify_send_error)?;

        if !response.status().is_success() {
            return Err(InstallError::RequestRejected(response.status().as_u16()));
        }

        let total = response
            .content_length()
            .ok_or(InstallError::ContentLengthMissing)?;

        let mut file = fs::File::create(dest)
            .await
            .map_err(InstallError::ChunkWriteFailed)?;

        let mut received = 0u64;
        loop {
            let chunk = response
                .chunk()
                .await
                .map_err(|e| InstallError::ChunkReadFailed(e.to_string()))?;
            let Some(chunk) = chunk else { break };

            file.write_all(&chunk)
                .await
                .map_err(InstallError::ChunkWriteFailed)?;
            received += chunk.len() as u64;
            progress.fetched(received, total);
        }

        if received != total {
            return Err(InstallError::ChunkReadFailed(format!(
                "connection ended mid-download ({received}/{total} bytes)"
            )));
        }

        file.flush().await.map_err(InstallError::ChunkWriteFailed)?;
        Ok(received)
    }
}

/// Classify a request-phase failure so name resolution and connection
/// problems keep their own codes.
fn classify_send_error(error: reqwest::Error) -> InstallError {
    if is_dns_failure(&error) {
        return InstallError::DnsFailed(error.to_string());
    }
    if error.is_connect() || error.is_timeout() {
        return InstallError::SocketConnectFailed(error.to_string());
    }
    InstallError::ChunkReadFailed(error.to_string())
}

/// Resolution failures surface deep in the error chain; the transport
/// labels them as dns errors.
fn is_dns_failure(error: &reqwest::Error) -> bool {
    let mut source = error.source();
    while let Some(inner) = source {
        if inner.to_string().contains("dns error") {
            return true;
        }
        source = inner.source();
    }
    false
}
