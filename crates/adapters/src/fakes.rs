//! In-memory service fakes for engine and spec tests.

use crate::convert::ConvertService;
use crate::dimp::DimpService;
use crate::http::{Fetched, Fetcher};
use crate::torch::{PollOutcome, TorchService};
use aether_core::{DimpConfig, ErrorRecord, TorchConfig};
use chrono::Utc;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::path::Path;

fn unexpected(what: &str) -> ErrorRecord {
    ErrorRecord::permanent(format!("fake received unexpected {what}"), Utc::now())
}

/// Echo DIMP: returns resources unchanged after an optional scripted
/// error prefix.
#[derive(Debug, Default)]
pub struct FakeDimp {
    script: Mutex<VecDeque<ErrorRecord>>,
    pub calls: Mutex<Vec<Value>>,
}

impl FakeDimp {
    pub fn echo() -> Self {
        Self::default()
    }

    /// Fail with the given errors in order, then echo.
    pub fn failing_with(errors: Vec<ErrorRecord>) -> Self {
        Self { script: Mutex::new(errors.into()), calls: Mutex::new(Vec::new()) }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

impl DimpService for FakeDimp {
    async fn de_identify(&self, _dimp: &DimpConfig, resource: &Value) -> Result<Value, ErrorRecord> {
        self.calls.lock().push(resource.clone());
        if let Some(err) = self.script.lock().pop_front() {
            return Err(err);
        }
        Ok(resource.clone())
    }
}

/// Scripted TORCH: a submit response, a poll sequence, and a url→content
/// map for downloads.
#[derive(Debug, Default)]
pub struct FakeTorch {
    submit_response: Mutex<Option<Result<String, ErrorRecord>>>,
    polls: Mutex<VecDeque<Result<PollOutcome, ErrorRecord>>>,
    files: HashMap<String, Vec<u8>>,
    pub submit_count: Mutex<u32>,
    pub poll_count: Mutex<u32>,
}

impl FakeTorch {
    pub fn accepting(extraction_url: &str) -> Self {
        Self {
            submit_response: Mutex::new(Some(Ok(extraction_url.to_string()))),
            ..Self::default()
        }
    }

    pub fn rejecting(error: ErrorRecord) -> Self {
        Self { submit_response: Mutex::new(Some(Err(error))), ..Self::default() }
    }

    pub fn with_polls(self, polls: Vec<Result<PollOutcome, ErrorRecord>>) -> Self {
        *self.polls.lock() = polls.into();
        self
    }

    pub fn with_file(mut self, url: &str, content: &[u8]) -> Self {
        self.files.insert(url.to_string(), content.to_vec());
        self
    }
}

impl TorchService for FakeTorch {
    async fn submit(&self, _torch: &TorchConfig, _crtdl: &[u8]) -> Result<String, ErrorRecord> {
        *self.submit_count.lock() += 1;
        self.submit_response.lock().take().unwrap_or_else(|| Err(unexpected("submit")))
    }

    async fn poll(&self, _torch: &TorchConfig, _url: &str) -> Result<PollOutcome, ErrorRecord> {
        *self.poll_count.lock() += 1;
        self.polls.lock().pop_front().unwrap_or_else(|| Err(unexpected("poll")))
    }

    async fn download(&self, _torch: &TorchConfig, file_url: &str, dest: &Path) -> Result<u64, ErrorRecord> {
        let content = self.files.get(file_url).ok_or_else(|| unexpected("download url"))?;
        std::fs::write(dest, content)
            .map_err(|e| ErrorRecord::transient(format!("write failed: {e}"), Utc::now()))?;
        Ok(content.len() as u64)
    }
}

/// One scripted response for a fetched URL.
#[derive(Debug, Clone)]
pub enum FakeFetchResponse {
    Listing(String),
    File(Vec<u8>),
    Error(ErrorRecord),
}

/// Scripted fetcher keyed by URL. Each URL's queue pops in order; the
/// final entry repeats so steady-state responses need only one entry.
#[derive(Debug, Default)]
pub struct FakeFetcher {
    responses: Mutex<HashMap<String, VecDeque<FakeFetchResponse>>>,
    pub fetched: Mutex<Vec<String>>,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(self, url: &str, response: FakeFetchResponse) -> Self {
        self.responses.lock().entry(url.to_string()).or_default().push_back(response);
        self
    }
}

impl Fetcher for FakeFetcher {
    async fn fetch(&self, url: &str, dest: &Path) -> Result<Fetched, ErrorRecord> {
        self.fetched.lock().push(url.to_string());
        let response = {
            let mut responses = self.responses.lock();
            let Some(queue) = responses.get_mut(url) else {
                return Err(unexpected("url"));
            };
            if queue.len() > 1 {
                queue.pop_front()
            } else {
                queue.front().cloned()
            }
        };
        match response {
            None => Err(unexpected("url")),
            Some(FakeFetchResponse::Listing(html)) => Ok(Fetched::Listing(html)),
            Some(FakeFetchResponse::File(content)) => {
                std::fs::write(dest, &content)
                    .map_err(|e| ErrorRecord::transient(format!("write failed: {e}"), Utc::now()))?;
                Ok(Fetched::File { bytes: content.len() as u64 })
            }
            Some(FakeFetchResponse::Error(err)) => Err(err),
        }
    }
}

/// Conversion fake: prefixes a marker line so tests can assert the
/// service saw the right group.
#[derive(Debug, Default)]
pub struct FakeConvert {
    script: Mutex<VecDeque<ErrorRecord>>,
    pub calls: Mutex<Vec<(String, String)>>,
}

impl FakeConvert {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_with(errors: Vec<ErrorRecord>) -> Self {
        Self { script: Mutex::new(errors.into()), calls: Mutex::new(Vec::new()) }
    }
}

impl ConvertService for FakeConvert {
    async fn convert(
        &self,
        service_url: &str,
        resource_type: &str,
        ndjson: Vec<u8>,
    ) -> Result<Vec<u8>, ErrorRecord> {
        self.calls.lock().push((service_url.to_string(), resource_type.to_string()));
        if let Some(err) = self.script.lock().pop_front() {
            return Err(err);
        }
        let mut out = format!("CONVERTED {resource_type}\n").into_bytes();
        out.extend_from_slice(&ndjson);
        Ok(out)
    }
}
