//! Where architecture configs come from
//!
//! Network fetching lives outside this crate. What ships here reads configs
//! already on disk, either from a HuggingFace hub cache or from a plain
//! directory of `config.json` files.

use crate::config::ArchitectureConfig;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Best-effort architecture lookup by repository id
pub trait ConfigSource {
    fn fetch_config(&self, repo_id: &str) -> Option<ArchitectureConfig>;
}

/// Never finds anything; forces the parameter-count fallback
#[derive(Debug, Clone, Copy, Default)]
pub struct NoConfigSource;

impl ConfigSource for NoConfigSource {
    fn fetch_config(&self, _repo_id: &str) -> Option<ArchitectureConfig> {
        None
    }
}

/// In-memory configs keyed by repository id
#[derive(Debug, Clone, Default)]
pub struct StaticConfigSource {
    configs: HashMap<String, ArchitectureConfig>,
}

impl StaticConfigSource {
    pub fn with(mut self, repo_id: &str, config: ArchitectureConfig) -> Self {
        self.configs.insert(repo_id.to_string(), config);
        self
    }
}

impl ConfigSource for StaticConfigSource {
    fn fetch_config(&self, repo_id: &str) -> Option<ArchitectureConfig> {
        self.configs.get(repo_id).cloned()
    }
}

/// Reads `config.json` from a HuggingFace hub cache
/// (`<hub>/models--org--name/snapshots/<rev>/config.json`), newest snapshot first.
#[derive(Debug, Clone)]
pub struct HfCacheConfigSource {
    hub_dir: PathBuf,
}

impl HfCacheConfigSource {
    pub fn new(hub_dir: impl Into<PathBuf>) -> Self {
        Self {
            hub_dir: hub_dir.into(),
        }
    }

    /// `$HF_HOME/hub`, or `~/.cache/huggingface/hub`
    pub fn from_env() -> Option<Self> {
        if let Ok(hf_home) = std::env::var("HF_HOME") {
            return Some(Self::new(Path::new(&hf_home).join("hub")));
        }
        let home = std::env::var("HOME").ok()?;
        Some(Self::new(
            Path::new(&home).join(".cache").join("huggingface").join("hub"),
        ))
    }

    pub fn model_cache_dir(&self, repo_id: &str) -> Option<PathBuf> {
        if !repo_id.contains('/') {
            return None;
        }
        let dir = self
            .hub_dir
            .join(format!("models--{}", repo_id.replace('/', "--")));
        dir.exists().then_some(dir)
    }

    /// Snapshot directories, newest first
    pub fn list_snapshots(&self, repo_id: &str) -> Vec<PathBuf> {
        let Some(cache_dir) = self.model_cache_dir(repo_id) else {
            return Vec::new();
        };
        let Ok(entries) = fs::read_dir(cache_dir.join("snapshots")) else {
            return Vec::new();
        };

        let mut snapshots: Vec<PathBuf> = entries
            .flatten()
            .filter(|e| e.file_type().ok().is_some_and(|ft| ft.is_dir()))
            .map(|e| e.path())
            .collect();

        snapshots.sort_by(|a, b| {
            let a_time = a.metadata().ok().and_then(|m| m.modified().ok());
            let b_time = b.metadata().ok().and_then(|m| m.modified().ok());
            b_time.cmp(&a_time)
        });

        snapshots
    }
}

impl ConfigSource for HfCacheConfigSource {
    fn fetch_config(&self, repo_id: &str) -> Option<ArchitectureConfig> {
        self.list_snapshots(repo_id).iter().find_map(|snapshot| {
            let path = snapshot.join("config.json");
            let config = read_config_file(&path)?;
            debug!(path = %path.display(), "loaded architecture config from hub cache");
            Some(config)
        })
    }
}

/// Reads `<dir>/<org>/<name>/config.json`
#[derive(Debug, Clone)]
pub struct DirConfigSource {
    root: PathBuf,
}

impl DirConfigSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ConfigSource for DirConfigSource {
    fn fetch_config(&self, repo_id: &str) -> Option<ArchitectureConfig> {
        read_config_file(&self.root.join(repo_id).join("config.json"))
    }
}

/// Try each source in order
pub struct ChainedConfigSource {
    sources: Vec<Box<dyn ConfigSource>>,
}

impl ChainedConfigSource {
    pub fn new(sources: Vec<Box<dyn ConfigSource>>) -> Self {
        Self { sources }
    }
}

impl ConfigSource for ChainedConfigSource {
    fn fetch_config(&self, repo_id: &str) -> Option<ArchitectureConfig> {
        self.sources.iter().find_map(|s| s.fetch_config(repo_id))
    }
}

/// Parse a `config.json` file; unreadable or malformed files yield `None`
pub fn read_config_file(path: &Path) -> Option<ArchitectureConfig> {
    let json = fs::read_to_string(path).ok()?;
    match ArchitectureConfig::from_hf_str(&json) {
        Ok(config) => Some(config),
        Err(e) => {
            debug!(path = %path.display(), error = %e, "ignoring malformed config.json");
            None
        }
    }
}
