//! Input classification: decide what kind of source a single string names.

use crate::crtdl::{self, CrtdlError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Kind of input a job was created from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InputType {
    LocalDir,
    HttpUrl,
    CrtdlFile,
    TorchUrl,
}

crate::simple_display! {
    InputType {
        LocalDir => "LOCAL_DIR",
        HttpUrl => "HTTP_URL",
        CrtdlFile => "CRTDL_FILE",
        TorchUrl => "TORCH_URL",
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ClassifyError {
    #[error("cannot classify input '{input}': not a directory, http(s) URL, or CRTDL file")]
    UnknownInput { input: String },
    #[error("invalid CRTDL file {path}: {source}")]
    InvalidCrtdl {
        path: PathBuf,
        #[source]
        source: CrtdlError,
    },
}

/// Classify an input string.
///
/// Decision order: existing directory, then http(s) URL (TORCH result URLs
/// carry a `/fhir/` path segment), then an existing `.crtdl`/`.json` file
/// with valid CRTDL content. Everything else is unknown.
pub fn classify(input: &str) -> Result<InputType, ClassifyError> {
    let path = Path::new(input);
    if path.is_dir() {
        return Ok(InputType::LocalDir);
    }

    if input.starts_with("http://") || input.starts_with("https://") {
        if input.contains("/fhir/") {
            return Ok(InputType::TorchUrl);
        }
        return Ok(InputType::HttpUrl);
    }

    if path.is_file() && has_crtdl_extension(path) {
        crtdl::validate_file(path).map_err(|source| ClassifyError::InvalidCrtdl {
            path: path.to_path_buf(),
            source,
        })?;
        return Ok(InputType::CrtdlFile);
    }

    Err(ClassifyError::UnknownInput { input: input.to_string() })
}

fn has_crtdl_extension(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("crtdl") | Some("json")
    )
}

#[cfg(test)]
#[path = "input_tests.rs"]
mod tests;
