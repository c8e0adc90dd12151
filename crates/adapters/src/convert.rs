//! CSV/Parquet conversion client.
//!
//! Both services share a contract: POST NDJSON for one resource type,
//! receive the converted file back in the body.

use crate::http::{now, status_error, transport_error};
use aether_core::ErrorRecord;
use std::future::Future;

pub const NDJSON_CONTENT_TYPE: &str = "application/x-ndjson";

pub trait ConvertService {
    /// Convert one resource-type group of NDJSON; returns the output file bytes.
    fn convert(
        &self,
        service_url: &str,
        resource_type: &str,
        ndjson: Vec<u8>,
    ) -> impl Future<Output = Result<Vec<u8>, ErrorRecord>> + Send;
}

#[derive(Debug, Clone)]
pub struct HttpConvert {
    client: reqwest::Client,
}

impl HttpConvert {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl ConvertService for HttpConvert {
    async fn convert(
        &self,
        service_url: &str,
        resource_type: &str,
        ndjson: Vec<u8>,
    ) -> Result<Vec<u8>, ErrorRecord> {
        let response = self
            .client
            .post(service_url)
            .header(reqwest::header::CONTENT_TYPE, NDJSON_CONTENT_TYPE)
            .header("X-Resource-Type", resource_type)
            .body(ndjson)
            .send()
            .await
            .map_err(|e| transport_error(&e))?;
        if !response.status().is_success() {
            return Err(status_error(response).await);
        }
        response
            .bytes()
            .await
            .map(|b| b.to_vec())
            .map_err(|e| transport_error(&e))
    }
}

#[cfg(test)]
#[path = "convert_tests.rs"]
mod tests;
