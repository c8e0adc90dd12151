//! DIMP pseudonymization client.

use crate::http::{now, status_error, transport_error};
use aether_core::{DimpConfig, ErrorRecord};
use serde_json::Value;
use std::future::Future;

pub const DE_IDENTIFY_OPERATION: &str = "$de-identify";

/// The DIMP `$de-identify` operation: one FHIR resource in, the
/// same-shaped pseudonymized resource out.
pub trait DimpService {
    fn de_identify(
        &self,
        dimp: &DimpConfig,
        resource: &Value,
    ) -> impl Future<Output = Result<Value, ErrorRecord>> + Send;
}

#[derive(Debug, Clone)]
pub struct HttpDimp {
    client: reqwest::Client,
}

impl HttpDimp {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl DimpService for HttpDimp {
    async fn de_identify(&self, dimp: &DimpConfig, resource: &Value) -> Result<Value, ErrorRecord> {
        let base = dimp.url.as_deref().ok_or_else(|| {
            ErrorRecord::permanent("services.dimp.url is not configured", now())
        })?;
        let url = format!("{}/{DE_IDENTIFY_OPERATION}", base.trim_end_matches('/'));

        let response = self
            .client
            .post(&url)
            .json(resource)
            .send()
            .await
            .map_err(|e| transport_error(&e))?;
        if !response.status().is_success() {
            return Err(status_error(response).await);
        }
        response.json().await.map_err(|e| transport_error(&e))
    }
}

#[cfg(test)]
#[path = "dimp_tests.rs"]
mod tests;
