//! Shared HTTP plumbing: client construction, error mapping, resumable
//! downloads.

use aether_core::{ErrorRecord, ServicesConfig};
use chrono::{DateTime, SubsecRound, Utc};
use futures_util::StreamExt;
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;

pub(crate) fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(0)
}

/// Build the shared client with the configured request timeout.
pub fn build_client(services: &ServicesConfig) -> Result<reqwest::Client, ErrorRecord> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(services.http_timeout_seconds))
        .build()
        .map_err(|e| ErrorRecord::permanent(format!("failed to build http client: {e}"), now()))
}

/// Map a transport-level failure. Timeouts, connection errors and DNS
/// failures are all transient.
pub(crate) fn transport_error(err: &reqwest::Error) -> ErrorRecord {
    ErrorRecord::transient(format!("http transport error: {err}"), now())
}

/// Map a non-success response to an error record, using the body as the
/// message when it is short enough to be useful.
pub(crate) async fn status_error(response: reqwest::Response) -> ErrorRecord {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    let snippet = body.chars().take(200).collect::<String>();
    let message = if snippet.is_empty() {
        format!("http status {status}")
    } else {
        format!("http status {status}: {snippet}")
    };
    ErrorRecord::from_http_status(status, message, now())
}

/// Outcome of fetching a URL that may be a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fetched {
    /// An HTML page; the body is returned for link extraction.
    Listing(String),
    /// Content streamed to the destination file.
    File { bytes: u64 },
}

/// Plain (unauthenticated) HTTP fetching for the HTTP import step.
pub trait Fetcher {
    /// Fetch `url`. HTML responses come back as [`Fetched::Listing`];
    /// anything else is streamed to `dest`, resuming from the length of
    /// an existing partial file via a `Range` request.
    fn fetch(
        &self,
        url: &str,
        dest: &Path,
    ) -> impl std::future::Future<Output = Result<Fetched, ErrorRecord>> + Send;
}

#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str, dest: &Path) -> Result<Fetched, ErrorRecord> {
        let resume_from = match tokio::fs::metadata(dest).await {
            Ok(meta) => meta.len(),
            Err(_) => 0,
        };

        let mut request = self.client.get(url);
        if resume_from > 0 {
            request = request.header(reqwest::header::RANGE, format!("bytes={resume_from}-"));
        }
        let response = request.send().await.map_err(|e| transport_error(&e))?;

        let status = response.status();
        if !(status.is_success() || status == reqwest::StatusCode::PARTIAL_CONTENT) {
            return Err(status_error(response).await);
        }

        let is_html = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("text/html"));
        if is_html {
            let body = response.text().await.map_err(|e| transport_error(&e))?;
            return Ok(Fetched::Listing(body));
        }

        // A 200 after a Range request means the server restarted the
        // transfer; truncate the partial file instead of appending.
        let append = status == reqwest::StatusCode::PARTIAL_CONTENT;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .append(append)
            .truncate(!append)
            .open(dest)
            .await
            .map_err(|e| ErrorRecord::transient(format!("failed to open {}: {e}", dest.display()), now()))?;

        let mut written = if append { resume_from } else { 0 };
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| transport_error(&e))?;
            file.write_all(&chunk)
                .await
                .map_err(|e| ErrorRecord::transient(format!("write failed: {e}"), now()))?;
            written += chunk.len() as u64;
        }
        file.flush()
            .await
            .map_err(|e| ErrorRecord::transient(format!("flush failed: {e}"), now()))?;
        Ok(Fetched::File { bytes: written })
    }
}

/// Pull `href="…"` targets ending in `.ndjson` out of a directory listing.
pub fn extract_ndjson_links(base_url: &str, html: &str) -> Vec<String> {
    let mut links = Vec::new();
    let mut rest = html;
    while let Some(start) = rest.find("href=\"") {
        rest = &rest[start + 6..];
        let Some(end) = rest.find('"') else { break };
        let target = &rest[..end];
        rest = &rest[end..];
        if !target.ends_with(".ndjson") {
            continue;
        }
        if target.starts_with("http://") || target.starts_with("https://") {
            links.push(target.to_string());
        } else {
            let base = base_url.trim_end_matches('/');
            links.push(format!("{base}/{}", target.trim_start_matches('/')));
        }
    }
    links
}

#[cfg(test)]
#[path = "http_tests.rs"]
mod tests;
