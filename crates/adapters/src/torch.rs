//! TORCH extraction client: submit, poll, download.

use crate::http::{now, status_error, transport_error};
use aether_core::{ErrorRecord, TorchConfig};
use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine as _;
use futures_util::StreamExt;
use serde_json::{json, Value};
use std::future::Future;
use std::path::Path;
use tokio::io::AsyncWriteExt;

pub const EXTRACT_OPERATION: &str = "fhir/$extract-data";
pub const FHIR_JSON: &str = "application/fhir+json";

/// Result of one poll of the extraction status URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// HTTP 202: still processing.
    InProgress,
    /// HTTP 200: extraction complete; NDJSON file URLs to download.
    Complete(Vec<String>),
}

/// The TORCH submit/poll/download protocol.
pub trait TorchService {
    /// Submit a CRTDL; returns the Content-Location status URL.
    fn submit(
        &self,
        torch: &TorchConfig,
        crtdl: &[u8],
    ) -> impl Future<Output = Result<String, ErrorRecord>> + Send;

    /// Poll the status URL once.
    fn poll(
        &self,
        torch: &TorchConfig,
        extraction_url: &str,
    ) -> impl Future<Output = Result<PollOutcome, ErrorRecord>> + Send;

    /// Download one result file to `dest`; returns bytes written.
    fn download(
        &self,
        torch: &TorchConfig,
        file_url: &str,
        dest: &Path,
    ) -> impl Future<Output = Result<u64, ErrorRecord>> + Send;
}

/// Wrap CRTDL bytes in the FHIR Parameters submission body.
pub fn submission_parameters(crtdl: &[u8]) -> Value {
    json!({
        "resourceType": "Parameters",
        "parameter": [
            {"name": "crtdl", "valueBase64Binary": B64.encode(crtdl)}
        ]
    })
}

/// Decode the CRTDL back out of a submission body (round-trip law).
pub fn decode_submission(parameters: &Value) -> Option<Vec<u8>> {
    let encoded = parameters
        .get("parameter")?
        .as_array()?
        .iter()
        .find(|p| p.get("name").and_then(Value::as_str) == Some("crtdl"))?
        .get("valueBase64Binary")?
        .as_str()?;
    B64.decode(encoded).ok()
}

/// Mine NDJSON file URLs out of the extraction-complete Parameters body:
/// every `{name: "url", valueUrl: …}` entry, top-level or nested in `part`.
pub fn result_file_urls(parameters: &Value) -> Vec<String> {
    let mut urls = Vec::new();
    let Some(params) = parameters.get("parameter").and_then(Value::as_array) else {
        return urls;
    };
    for param in params {
        collect_url(param, &mut urls);
        if let Some(parts) = param.get("part").and_then(Value::as_array) {
            for part in parts {
                collect_url(part, &mut urls);
            }
        }
    }
    urls
}

fn collect_url(node: &Value, urls: &mut Vec<String>) {
    if node.get("name").and_then(Value::as_str) == Some("url") {
        if let Some(url) = node.get("valueUrl").and_then(Value::as_str) {
            urls.push(url.to_string());
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpTorch {
    client: reqwest::Client,
}

impl HttpTorch {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    fn authed(&self, request: reqwest::RequestBuilder, torch: &TorchConfig) -> reqwest::RequestBuilder {
        request.basic_auth(&torch.username, Some(&torch.password))
    }
}

impl TorchService for HttpTorch {
    async fn submit(&self, torch: &TorchConfig, crtdl: &[u8]) -> Result<String, ErrorRecord> {
        let base = torch.base_url.as_deref().ok_or_else(|| {
            ErrorRecord::permanent("services.torch.base_url is not configured", now())
        })?;
        let url = format!("{}/{EXTRACT_OPERATION}", base.trim_end_matches('/'));

        let response = self
            .authed(self.client.post(&url), torch)
            .header(reqwest::header::CONTENT_TYPE, FHIR_JSON)
            .json(&submission_parameters(crtdl))
            .send()
            .await
            .map_err(|e| transport_error(&e))?;

        if response.status() != reqwest::StatusCode::ACCEPTED {
            return Err(status_error(response).await);
        }
        response
            .headers()
            .get(reqwest::header::CONTENT_LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| {
                ErrorRecord::permanent("TORCH accepted the extraction but sent no Content-Location", now())
            })
    }

    async fn poll(&self, torch: &TorchConfig, extraction_url: &str) -> Result<PollOutcome, ErrorRecord> {
        let response = self
            .authed(self.client.get(extraction_url), torch)
            .send()
            .await
            .map_err(|e| transport_error(&e))?;

        match response.status().as_u16() {
            202 => Ok(PollOutcome::InProgress),
            200 => {
                let body: Value = response.json().await.map_err(|e| transport_error(&e))?;
                Ok(PollOutcome::Complete(result_file_urls(&body)))
            }
            // The extraction itself failed; re-polling the same URL cannot succeed.
            status @ (410 | 500) => {
                let err = status_error(response).await;
                Err(ErrorRecord::permanent(err.message, now()).with_status(status))
            }
            _ => Err(status_error(response).await),
        }
    }

    async fn download(&self, torch: &TorchConfig, file_url: &str, dest: &Path) -> Result<u64, ErrorRecord> {
        let response = self
            .authed(self.client.get(file_url), torch)
            .send()
            .await
            .map_err(|e| transport_error(&e))?;
        if !response.status().is_success() {
            return Err(status_error(response).await);
        }

        let mut file = tokio::fs::File::create(dest)
            .await
            .map_err(|e| ErrorRecord::transient(format!("failed to create {}: {e}", dest.display()), now()))?;
        let mut written = 0u64;
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
        Ok(written)
    }
}

#[cfg(test)]
#[path = "torch_tests.rs"]
mod tests;
