use super::source::ConfigSource;
use crate::config::ArchitectureConfig;
use crate::memory_estimator::{estimate_config_from_params, EstimateError};
use anyhow::Context;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// A selectable model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelEntry {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub huggingface_repo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modelscope_repo: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    /// Human-readable parameter count, e.g. "7B"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_length: Option<u64>,
}

impl ModelEntry {
    /// Entry for a repository that is not in the catalog
    pub fn custom(repo_id: &str) -> Self {
        Self {
            id: "custom".to_string(),
            name: repo_id.to_string(),
            huggingface_repo: Some(repo_id.to_string()),
            modelscope_repo: None,
            description: "Custom model".to_string(),
            category: "custom".to_string(),
            parameters: None,
            context_length: None,
        }
    }

    /// Repository used to look up the architecture config
    pub fn repo_id(&self) -> Option<&str> {
        self.huggingface_repo
            .as_deref()
            .or(self.modelscope_repo.as_deref())
    }

    /// Pick the architecture config for this entry.
    ///
    /// A fetched config wins; otherwise the parameter label selects a
    /// preset. With neither, the model cannot be estimated.
    pub fn resolve_config(
        &self,
        fetched: Option<ArchitectureConfig>,
    ) -> Result<ArchitectureConfig, EstimateError> {
        if let Some(config) = fetched {
            return Ok(config);
        }

        match &self.parameters {
            Some(label) => {
                debug!(model = %self.name, label = %label, "falling back to parameter-count preset");
                estimate_config_from_params(label)
            }
            None => Err(EstimateError::Unresolvable(self.name.clone())),
        }
    }

    /// Ask `source` for the config, then fall back as in [`Self::resolve_config`]
    pub fn resolve_with(
        &self,
        source: &dyn ConfigSource,
    ) -> Result<ArchitectureConfig, EstimateError> {
        let fetched = self.repo_id().and_then(|repo| {
            let config = source.fetch_config(repo);
            if config.is_none() {
                warn!(repo, "no architecture config found");
            }
            config
        });
        self.resolve_config(fetched)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct CatalogFile {
    models: Vec<ModelEntry>,
}

/// Read-only model list
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelCatalog {
    models: Vec<ModelEntry>,
}

static BUILTIN: Lazy<ModelCatalog> = Lazy::new(|| {
    let models = json!([
        {
            "id": "meta-llama-llama-2-70b-chat-hf",
            "name": "Llama-2-70b-chat-hf",
            "huggingface_repo": "meta-llama/Llama-2-70b-chat-hf",
            "description": "Meta Llama 2 70B chat model",
            "category": "chat",
            "parameters": "70B",
            "context_length": 4096
        },
        {
            "id": "mistralai-mistral-7b-instruct-v0-2",
            "name": "Mistral-7B-Instruct-v0.2",
            "huggingface_repo": "mistralai/Mistral-7B-Instruct-v0.2",
            "description": "Mistral AI 7B instruction-tuned model",
            "category": "instruct",
            "parameters": "7B",
            "context_length": 32768
        },
        {
            "id": "codellama-codellama-34b-instruct-hf",
            "name": "CodeLlama-34b-Instruct-hf",
            "huggingface_repo": "codellama/CodeLlama-34b-Instruct-hf",
            "description": "Code Llama 34B instruction-tuned model",
            "category": "code",
            "parameters": "34B",
            "context_length": 16384
        },
        {
            "id": "thudm-chatglm3-6b",
            "name": "chatglm3-6b",
            "huggingface_repo": "THUDM/chatglm3-6b",
            "description": "Tsinghua ChatGLM3 6B bilingual chat model",
            "category": "chat",
            "parameters": "6B",
            "context_length": 8192
        },
        {
            "id": "qwen-qwen-14b-chat",
            "name": "Qwen-14B-Chat",
            "huggingface_repo": "Qwen/Qwen-14B-Chat",
            "description": "Alibaba Qwen 14B chat model",
            "category": "chat",
            "parameters": "14B",
            "context_length": 8192
        }
    ]);

    ModelCatalog {
        models: serde_json::from_value(models).expect("built-in model catalog is valid"),
    }
});

impl ModelCatalog {
    pub fn new(models: Vec<ModelEntry>) -> Self {
        Self { models }
    }

    pub fn builtin() -> &'static ModelCatalog {
        &BUILTIN
    }

    /// Parse a `{"models": [...]}` document
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let file: CatalogFile = serde_json::from_str(json)?;
        Ok(Self {
            models: file.models,
        })
    }

    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read model catalog {}", path.display()))?;
        Self::from_json(&json)
            .with_context(|| format!("Invalid model catalog {}", path.display()))
    }

    pub fn models(&self) -> &[ModelEntry] {
        &self.models
    }

    pub fn get(&self, id: &str) -> Option<&ModelEntry> {
        self.models
            .iter()
            .find(|m| m.id == id || m.huggingface_repo.as_deref() == Some(id))
    }

    /// Case-insensitive substring match on name or category
    pub fn search(&self, term: &str) -> Vec<&ModelEntry> {
        let term = term.to_lowercase();
        self.models
            .iter()
            .filter(|m| {
                m.name.to_lowercase().contains(&term) || m.category.to_lowercase().contains(&term)
            })
            .collect()
    }
}
