//! FHIR Bundle splitting and reassembly.
//!
//! DIMP rejects payloads above a configured size. Bundles above the
//! threshold are partitioned into chunks that are themselves valid FHIR
//! Bundles; after pseudonymization the chunks reassemble into one Bundle
//! whose entries sit at the same positions as the input's.
//!
//! Sizes are exact serialized JSON byte counts; the decision controls HTTP
//! correctness, so estimates are not good enough.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Bundle types that may be partitioned. `transaction` and `batch` carry
/// atomic-processing semantics and always take the direct-send path.
const SPLITTABLE_TYPES: [&str; 2] = ["document", "collection"];

#[derive(Debug, thiserror::Error)]
pub enum BundleError {
    #[error("failed to serialize resource: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("Bundle.entry must be an array when present")]
    EntryNotArray,
}

/// Exact serialized size of a resource in bytes.
pub fn serialized_size(value: &Value) -> Result<usize, BundleError> {
    Ok(serde_json::to_vec(value)?.len())
}

pub fn is_bundle(resource: &Value) -> bool {
    resource.get("resourceType").and_then(Value::as_str) == Some("Bundle")
}

fn bundle_type(resource: &Value) -> Option<&str> {
    resource.get("type").and_then(Value::as_str)
}

fn is_splittable_type(resource: &Value) -> bool {
    bundle_type(resource).is_some_and(|t| SPLITTABLE_TYPES.contains(&t))
}

fn resource_id(resource: &Value) -> &str {
    resource.get("id").and_then(Value::as_str).unwrap_or("bundle")
}

/// A non-Bundle resource too large to submit; skipped and reported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OversizedResource {
    pub resource_type: String,
    pub id: String,
    pub size: usize,
    pub threshold: usize,
}

impl OversizedResource {
    pub fn guidance(&self) -> &'static str {
        "a single resource cannot be subdivided; raise bundle_split_threshold_mb \
         or reduce the resource at the source"
    }
}

/// How a single NDJSON resource should be submitted to DIMP.
#[derive(Debug, Clone, PartialEq)]
pub enum SplitDecision {
    /// At or below threshold, or a Bundle type exempt from splitting.
    SendDirect,
    /// A splittable Bundle above the threshold.
    Split,
    /// A non-Bundle resource above the threshold: skip and report.
    SkipOversized(OversizedResource),
}

/// Decide the submission path for one resource. Threshold comparison is
/// strict: a resource exactly at the threshold is sent directly.
pub fn split_decision(resource: &Value, threshold_bytes: usize) -> Result<SplitDecision, BundleError> {
    let size = serialized_size(resource)?;
    if size <= threshold_bytes {
        return Ok(SplitDecision::SendDirect);
    }
    if is_bundle(resource) {
        if is_splittable_type(resource) {
            return Ok(SplitDecision::Split);
        }
        tracing::warn!(
            bundle_type = bundle_type(resource).unwrap_or("unknown"),
            size,
            threshold_bytes,
            "oversized Bundle of non-splittable type sent directly"
        );
        return Ok(SplitDecision::SendDirect);
    }
    Ok(SplitDecision::SkipOversized(OversizedResource {
        resource_type: resource
            .get("resourceType")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string(),
        id: resource.get("id").and_then(Value::as_str).unwrap_or("").to_string(),
        size,
        threshold: threshold_bytes,
    }))
}

/// Materialize chunk `index` of `original` as a complete FHIR Bundle.
///
/// `total` reflects the chunk, not the original; `signature` and `link`
/// are dropped because they would be invalid over a subset.
fn materialize_chunk(original: &Value, index: usize, entries: Vec<Value>) -> Value {
    let mut obj = Map::new();
    obj.insert("resourceType".into(), Value::from("Bundle"));
    obj.insert("id".into(), Value::from(format!("{}-chunk-{index}", resource_id(original))));
    if let Some(bundle_type) = original.get("type") {
        obj.insert("type".into(), bundle_type.clone());
    }
    if let Some(timestamp) = original.get("timestamp") {
        obj.insert("timestamp".into(), timestamp.clone());
    }
    obj.insert("total".into(), Value::from(entries.len() as u64));
    obj.insert("entry".into(), Value::Array(entries));
    Value::Object(obj)
}

/// Greedily partition a Bundle's entries: a chunk closes once the
/// envelope plus its accumulated entry sizes would pass `threshold_bytes`.
///
/// A single entry larger than the threshold still gets a chunk of its own
/// (entries are never subdivided); that chunk exceeds the threshold and is
/// logged at warn level. A Bundle with zero entries yields one empty chunk.
pub fn split_bundle(original: &Value, threshold_bytes: usize) -> Result<Vec<Value>, BundleError> {
    let entries = match original.get("entry") {
        None => &[] as &[Value],
        Some(Value::Array(entries)) => entries.as_slice(),
        Some(_) => return Err(BundleError::EntryNotArray),
    };

    let envelope_size = serialized_size(&materialize_chunk(original, 0, Vec::new()))?;

    let mut partitions: Vec<Vec<Value>> = Vec::new();
    let mut current: Vec<Value> = Vec::new();
    let mut current_size = envelope_size;
    for entry in entries {
        let entry_size = serialized_size(entry)?;
        if !current.is_empty() && current_size + entry_size > threshold_bytes {
            partitions.push(std::mem::take(&mut current));
            current_size = envelope_size;
        }
        if current.is_empty() && envelope_size + entry_size > threshold_bytes {
            tracing::warn!(
                entry_size,
                threshold_bytes,
                "single Bundle entry exceeds the split threshold; emitting an oversized chunk"
            );
        }
        current.push(entry.clone());
        current_size += entry_size;
    }
    if !current.is_empty() || partitions.is_empty() {
        partitions.push(current);
    }

    Ok(partitions
        .into_iter()
        .enumerate()
        .map(|(index, entries)| materialize_chunk(original, index, entries))
        .collect())
}

/// Concatenate pseudonymized chunks back into one Bundle carrying the
/// original id, type and timestamp.
///
/// Integrity invariant: entry `i` of the result corresponds to entry `i`
/// of the original (chunks are processed and passed back in index order).
pub fn reassemble(original: &Value, chunks: &[Value]) -> Result<Value, BundleError> {
    let mut entries: Vec<Value> = Vec::new();
    for chunk in chunks {
        match chunk.get("entry") {
            None => {}
            Some(Value::Array(chunk_entries)) => entries.extend(chunk_entries.iter().cloned()),
            Some(_) => return Err(BundleError::EntryNotArray),
        }
    }

    let mut obj = Map::new();
    obj.insert("resourceType".into(), Value::from("Bundle"));
    if let Some(id) = original.get("id") {
        obj.insert("id".into(), id.clone());
    }
    if let Some(bundle_type) = original.get("type") {
        obj.insert("type".into(), bundle_type.clone());
    }
    if let Some(timestamp) = original.get("timestamp") {
        obj.insert("timestamp".into(), timestamp.clone());
    }
    obj.insert("total".into(), Value::from(entries.len() as u64));
    obj.insert("entry".into(), Value::Array(entries));
    Ok(Value::Object(obj))
}

#[cfg(test)]
#[path = "bundle_tests.rs"]
mod tests;
