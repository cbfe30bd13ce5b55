//! Model metadata recovered from repository files

use crate::memory_estimator::parse_param_label;
use crate::utils::{bytes_to_gb, round2};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelFileInfo {
    pub path: String,
    pub size: u64,
    #[serde(rename = "type")]
    pub kind: String,
}

impl ModelFileInfo {
    pub fn new(path: impl Into<String>, size: u64) -> Self {
        Self {
            path: path.into(),
            size,
            kind: "file".to_string(),
        }
    }

    /// Checkpoint shards as opposed to tokenizer/config files
    pub fn is_weight_file(&self) -> bool {
        self.path.ends_with(".bin")
            || self.path.ends_with(".safetensors")
            || self.path.contains("pytorch_model")
    }
}

/// Total size of the weight files in GB
pub fn estimate_model_size(files: &[ModelFileInfo]) -> f64 {
    let total_bytes: u64 = files
        .iter()
        .filter(|f| f.is_weight_file())
        .map(|f| f.size)
        .sum();
    round2(bytes_to_gb(total_bytes as f64))
}

/// Regular files directly inside `dir`
pub fn list_model_files<P: AsRef<Path>>(dir: P) -> anyhow::Result<Vec<ModelFileInfo>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir.as_ref())? {
        let entry = entry?;
        // Hub snapshots are symlinks into blobs/, so follow them
        let metadata = fs::metadata(entry.path())?;
        if metadata.is_file() {
            files.push(ModelFileInfo::new(
                entry.file_name().to_string_lossy().to_string(),
                metadata.len(),
            ));
        }
    }
    files.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(files)
}

static README_PARAM_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)([0-9.]+)\s*billion?\s+parameters?",
        r"(?i)([0-9.]+)\s*b\s+parameters?",
        r"(?i)([0-9.]+)\s*million?\s+parameters?",
        r"(?i)([0-9.]+)\s*m\s+parameters?",
        r"(?i)parameters?[:\s]+([0-9.]+)\s*[bm]",
        r"(?i)model\s+size[:\s]+([0-9.]+)\s*[bm]",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// Find a parameter-count label ("7B", "350M") in README text.
///
/// Patterns are tried in order and the first hit wins. The unit is `B`
/// whenever the matched text contains a `b`, else `M`.
pub fn extract_param_count_from_readme(readme: &str) -> Option<String> {
    if readme.is_empty() {
        return None;
    }

    README_PARAM_PATTERNS.iter().find_map(|pattern| {
        let caps = pattern.captures(readme)?;
        let value = parse_param_label(&caps[1]).ok()?;
        let unit = if caps[0].to_lowercase().contains('b') {
            "B"
        } else {
            "M"
        };
        Some(format!("{}{}", value, unit))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_estimate_model_size() {
        let gb = 1024 * 1024 * 1024;
        let files = vec![
            ModelFileInfo::new("model-00001-of-00002.safetensors", 4 * gb),
            ModelFileInfo::new("model-00002-of-00002.safetensors", gb / 2),
            ModelFileInfo::new("pytorch_model.bin.index.json", 1024),
            ModelFileInfo::new("tokenizer.json", 10 * gb),
            ModelFileInfo::new("config.json", 800),
        ];
        let size = estimate_model_size(&files);
        assert_eq!(size, 4.5);
    }

    #[test]
    fn test_estimate_model_size_empty() {
        assert_eq!(estimate_model_size(&[]), 0.0);
    }

    #[test]
    fn test_list_model_files() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("model.safetensors"), vec![0u8; 2048]).unwrap();
        fs::write(temp_dir.path().join("config.json"), "{}").unwrap();
        fs::create_dir(temp_dir.path().join("subdir")).unwrap();

        let files = list_model_files(temp_dir.path()).unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].path, "config.json");
        assert_eq!(files[1].size, 2048);
        assert!(files[1].is_weight_file());
    }

    #[test]
    fn test_extract_billions() {
        let readme = "This model has 7 billion parameters and was trained on 2T tokens.";
        assert_eq!(extract_param_count_from_readme(readme).as_deref(), Some("7B"));

        let readme = "A 1.5B parameters model.";
        assert_eq!(extract_param_count_from_readme(readme).as_deref(), Some("1.5B"));
    }

    #[test]
    fn test_extract_millions() {
        let readme = "Compact: 350 million parameters.";
        assert_eq!(extract_param_count_from_readme(readme).as_deref(), Some("350M"));

        let readme = "Parameters: 125M";
        assert_eq!(extract_param_count_from_readme(readme).as_deref(), Some("125M"));
    }

    #[test]
    fn test_extract_model_size_line() {
        let readme = "## Specs\nModel size: 13B\nContext: 4k";
        assert_eq!(extract_param_count_from_readme(readme).as_deref(), Some("13B"));
    }

    #[test]
    fn test_extract_nothing() {
        assert_eq!(extract_param_count_from_readme(""), None);
        assert_eq!(extract_param_count_from_readme("A friendly chat model."), None);
    }
}
