//! GPU hardware catalog
//!
//! The catalog is plain data handed to the recommender; nothing in the
//! recommendation code reaches for a global list.

use anyhow::Context;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

const BUILTIN_GPUS_JSON: &str = include_str!("../../data/gpus.json");

/// One catalog record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GpuInfo {
    pub id: String,
    pub name: String,
    /// Memory capacity in GB
    pub memory: f64,
    /// Memory bandwidth in GB/s
    pub memory_bandwidth: f64,
    /// CUDA compute capability, e.g. "8.9"
    #[serde(default)]
    pub compute_capability: String,
    /// "low-high"
    pub price_range: String,
    /// Board power in watts
    pub power_consumption: f64,
    pub category: String,
    #[serde(default)]
    pub recommended_for: Vec<String>,
}

impl GpuInfo {
    /// Mean of the "low-high" price range, `None` if it does not parse
    pub fn mean_price(&self) -> Option<f64> {
        parse_price_range(&self.price_range).map(|(low, high)| (low + high) / 2.0)
    }

    /// Compute capability as a number, `None` when absent or unparsable
    pub fn compute_tier(&self) -> Option<f64> {
        let cc = self.compute_capability.trim();
        if cc.is_empty() {
            return None;
        }
        cc.parse::<f64>().ok()
    }

    pub fn is_professional(&self) -> bool {
        self.category.to_lowercase().contains("professional")
    }
}

/// Parse a `"low-high"` price range
pub fn parse_price_range(range: &str) -> Option<(f64, f64)> {
    let (low, high) = range.split_once('-')?;
    let parse = |s: &str| s.trim().replace(',', "").parse::<f64>().ok();
    Some((parse(low)?, parse(high)?))
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct CatalogFile {
    gpus: Vec<GpuInfo>,
}

/// Read-only GPU catalog, in source order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GpuCatalog {
    gpus: Vec<GpuInfo>,
}

static BUILTIN: Lazy<GpuCatalog> = Lazy::new(|| {
    GpuCatalog::from_json(BUILTIN_GPUS_JSON).expect("built-in GPU catalog is valid JSON")
});

impl GpuCatalog {
    /// Every GPU needs a positive, finite memory size
    pub fn new(gpus: Vec<GpuInfo>) -> anyhow::Result<Self> {
        if let Some(gpu) = gpus
            .iter()
            .find(|g| !(g.memory.is_finite() && g.memory > 0.0))
        {
            anyhow::bail!("GPU {} has invalid memory size {}", gpu.id, gpu.memory);
        }
        Ok(Self { gpus })
    }

    /// Catalog shipped with the crate
    pub fn builtin() -> &'static GpuCatalog {
        &BUILTIN
    }

    /// Parse a `{"gpus": [...]}` document
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let file: CatalogFile = serde_json::from_str(json)?;
        Self::new(file.gpus)
    }

    /// Load a `{"gpus": [...]}` document from disk
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read GPU catalog {}", path.display()))?;
        Self::from_json(&json).with_context(|| format!("Invalid GPU catalog {}", path.display()))
    }

    pub fn gpus(&self) -> &[GpuInfo] {
        &self.gpus
    }

    pub fn len(&self) -> usize {
        self.gpus.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gpus.is_empty()
    }

    /// Look up by id or case-insensitive name
    pub fn find(&self, key: &str) -> Option<&GpuInfo> {
        let key_lower = key.to_lowercase();
        self.gpus
            .iter()
            .find(|g| g.id == key || g.name.to_lowercase() == key_lower)
    }
}

#[cfg(test)]
pub(crate) fn test_gpu(name: &str, memory: f64, cc: &str, price: &str, power: f64, category: &str) -> GpuInfo {
    GpuInfo {
        id: name.to_lowercase().replace(' ', "-"),
        name: name.to_string(),
        memory,
        memory_bandwidth: 500.0,
        compute_capability: cc.to_string(),
        price_range: price.to_string(),
        power_consumption: power,
        category: category.to_string(),
        recommended_for: Vec::new(),
    }
}
