//! Configuration file loading: YAML or JSON by extension, with CLI flag
//! overrides applied before the configuration is used.

use aether_core::ProjectConfig;
use anyhow::{Context, Result};
use clap::Args;
use std::path::{Path, PathBuf};

/// Paths probed when no `--config` is given, in order.
const DEFAULT_PATHS: [&str; 3] = ["aether.yaml", "aether.yml", "aether.json"];

/// Flag overrides accepted by every command; each one replaces the
/// corresponding config-file value when set.
#[derive(Debug, Default, Args)]
pub struct ConfigOverrides {
    /// Directory that holds job state (overrides jobs_dir)
    #[arg(long, value_name = "DIR")]
    pub jobs_dir: Option<PathBuf>,

    /// DIMP service base URL (overrides services.dimp.url)
    #[arg(long = "dimp-url", value_name = "URL")]
    pub dimp_url: Option<String>,

    /// TORCH service base URL (overrides services.torch.base_url)
    #[arg(long = "torch-url", value_name = "URL")]
    pub torch_url: Option<String>,

    /// CSV conversion service URL (overrides services.csv_conversion_url)
    #[arg(long = "csv-url", value_name = "URL")]
    pub csv_url: Option<String>,

    /// Parquet conversion service URL (overrides services.parquet_conversion_url)
    #[arg(long = "parquet-url", value_name = "URL")]
    pub parquet_url: Option<String>,
}

impl ConfigOverrides {
    fn apply(&self, config: &mut ProjectConfig) {
        if let Some(jobs_dir) = &self.jobs_dir {
            config.jobs_dir = jobs_dir.clone();
        }
        if let Some(url) = &self.dimp_url {
            config.services.dimp.url = Some(url.clone());
        }
        if let Some(url) = &self.torch_url {
            config.services.torch.base_url = Some(url.clone());
        }
        if let Some(url) = &self.csv_url {
            config.services.csv_conversion_url = Some(url.clone());
        }
        if let Some(url) = &self.parquet_url {
            config.services.parquet_conversion_url = Some(url.clone());
        }
    }
}

/// Load the project configuration. An explicit path must exist; without
/// one the default paths are probed and built-in defaults apply last.
/// Flag overrides win over whatever the file said.
pub fn load(explicit: Option<&Path>, overrides: &ConfigOverrides) -> Result<ProjectConfig> {
    let mut config = match explicit {
        Some(path) => parse_file(path)?,
        None => {
            let found = DEFAULT_PATHS.iter().map(Path::new).find(|p| p.is_file());
            match found {
                Some(path) => parse_file(path)?,
                None => ProjectConfig::default(),
            }
        }
    };
    overrides.apply(&mut config);
    Ok(config)
}

fn parse_file(path: &Path) -> Result<ProjectConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read config file {}", path.display()))?;
    let is_json = path.extension().and_then(|e| e.to_str()) == Some("json");
    let config = if is_json {
        serde_json::from_str(&content)
            .with_context(|| format!("invalid JSON config {}", path.display()))?
    } else {
        serde_yaml::from_str(&content)
            .with_context(|| format!("invalid YAML config {}", path.display()))?
    };
    Ok(config)
}

#[cfg(test)]
#[path = "config_file_tests.rs"]
mod tests;
