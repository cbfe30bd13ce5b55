pub mod model;
pub mod workload;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub use model::{preset_for_billions, ArchitectureConfig, ResolvedArchitecture, PARAM_SIZE_PRESETS};
pub use workload::{Precision, UseCase, WorkloadParams};

/// Catalog sources. `None` means the built-in catalog.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogConfig {
    pub gpu_catalog: Option<String>,
    pub model_catalog: Option<String>,
}

/// CLI defaults, overridable per invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    pub workload: WorkloadParams,
    #[serde(default)]
    pub catalog: CatalogConfig,
    /// Print JSON instead of the text report
    #[serde(default)]
    pub json_output: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workload: WorkloadParams::default(),
            catalog: CatalogConfig::default(),
            json_output: false,
        }
    }
}

impl Config {
    /// Load config from JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Self = serde_json::from_str(&json)
            .with_context(|| format!("Invalid config {}", path.display()))?;
        config
            .workload
            .validate()
            .with_context(|| format!("Invalid workload in config {}", path.display()))?;
        Ok(config)
    }

    /// Load `path` if given and present, else defaults
    pub fn load_or_default<P: AsRef<Path>>(path: Option<P>) -> anyhow::Result<Self> {
        match path {
            Some(p) if p.as_ref().exists() => Self::load(p),
            _ => Ok(Self::default()),
        }
    }

    /// Save config to JSON file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path.as_ref(), json)?;
        Ok(())
    }
}
