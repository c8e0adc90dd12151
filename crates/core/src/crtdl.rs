//! CRTDL cohort-definition file syntax validation.
//!
//! Only syntax is checked here; semantic validation of cohort logic is
//! delegated to TORCH.

use serde_json::Value;
use std::path::Path;

/// Sanity cap on CRTDL file size.
pub const MAX_CRTDL_BYTES: u64 = 1_048_576;

#[derive(Debug, thiserror::Error)]
pub enum CrtdlError {
    #[error("file is {size} bytes; CRTDL files are capped at {MAX_CRTDL_BYTES} bytes")]
    TooLarge { size: u64 },
    #[error("failed to read CRTDL file: {0}")]
    Io(#[from] std::io::Error),
    #[error("not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("missing top-level cohortDefinition object")]
    MissingCohortDefinition,
    #[error("cohortDefinition.inclusionCriteria must be an array")]
    MissingInclusionCriteria,
    #[error("missing top-level dataExtraction object")]
    MissingDataExtraction,
    #[error("dataExtraction.attributeGroups must be an array")]
    MissingAttributeGroups,
}

/// Validate a CRTDL file on disk and return its raw bytes.
pub fn validate_file(path: &Path) -> Result<Vec<u8>, CrtdlError> {
    let size = std::fs::metadata(path)?.len();
    if size > MAX_CRTDL_BYTES {
        return Err(CrtdlError::TooLarge { size });
    }
    let bytes = std::fs::read(path)?;
    validate_bytes(&bytes)?;
    Ok(bytes)
}

/// Validate CRTDL content: a JSON object with a `cohortDefinition`
/// carrying an `inclusionCriteria` array and a `dataExtraction` carrying
/// an `attributeGroups` array.
pub fn validate_bytes(bytes: &[u8]) -> Result<(), CrtdlError> {
    let value: Value = serde_json::from_slice(bytes)?;

    let cohort = value
        .get("cohortDefinition")
        .and_then(Value::as_object)
        .ok_or(CrtdlError::MissingCohortDefinition)?;
    if !cohort.get("inclusionCriteria").is_some_and(Value::is_array) {
        return Err(CrtdlError::MissingInclusionCriteria);
    }

    let extraction = value
        .get("dataExtraction")
        .and_then(Value::as_object)
        .ok_or(CrtdlError::MissingDataExtraction)?;
    if !extraction.get("attributeGroups").is_some_and(Value::is_array) {
        return Err(CrtdlError::MissingAttributeGroups);
    }

    Ok(())
}

#[cfg(test)]
#[path = "crtdl_tests.rs"]
mod tests;
