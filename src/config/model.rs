use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Transformer architecture description as found in a model's `config.json`.
///
/// Every field is optional because real-world configs are inconsistent.
/// Use [`ArchitectureConfig::resolve`] to get the effective values with
/// defaults applied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArchitectureConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vocab_size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hidden_size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_hidden_layers: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_attention_heads: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intermediate_size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_position_embeddings: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_key_value_heads: Option<u64>,
    /// Carried for completeness; the estimator does not read it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rope_theta: Option<f64>,
}

/// Effective architecture values after default resolution.
///
/// - zero counts are treated as absent
/// - `ffn_size` falls back to `4 * hidden_size` (absent if that overflows)
/// - `kv_heads` falls back to `num_attention_heads` (no GQA)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedArchitecture {
    pub vocab_size: Option<u64>,
    pub hidden_size: Option<u64>,
    pub num_layers: Option<u64>,
    pub num_attention_heads: Option<u64>,
    pub ffn_size: Option<u64>,
    pub kv_heads: Option<u64>,
}

impl ArchitectureConfig {
    pub fn resolve(&self) -> ResolvedArchitecture {
        let positive = |v: Option<u64>| v.filter(|&n| n > 0);

        let hidden_size = positive(self.hidden_size);
        let num_attention_heads = positive(self.num_attention_heads);

        ResolvedArchitecture {
            vocab_size: positive(self.vocab_size),
            hidden_size,
            num_layers: positive(self.num_hidden_layers),
            num_attention_heads,
            ffn_size: positive(self.intermediate_size)
                .or_else(|| hidden_size.and_then(|h| h.checked_mul(4))),
            kv_heads: positive(self.num_key_value_heads).or(num_attention_heads),
        }
    }

    /// Parse a raw model config document, accepting the field aliases used
    /// by GPT-2, OPT, Falcon and friends.
    ///
    /// Documents wrapped as `{"Data": {...}}` are unwrapped first. Anything
    /// that is not a JSON object yields an empty config.
    pub fn from_hf_json(doc: &Value) -> Self {
        let doc = unwrap_data_envelope(doc);
        let Some(obj) = doc.as_object() else {
            return Self::default();
        };

        let count = |keys: &[&str]| -> Option<u64> {
            keys.iter().find_map(|k| obj.get(*k).and_then(as_positive_count))
        };

        Self {
            vocab_size: count(&["vocab_size", "vocabulary_size"]),
            hidden_size: count(&["hidden_size", "d_model", "n_embd"]),
            num_hidden_layers: count(&["num_hidden_layers", "n_layer", "num_layers"]),
            num_attention_heads: count(&["num_attention_heads", "n_head", "num_heads"]),
            intermediate_size: count(&["intermediate_size", "ffn_dim"]),
            max_position_embeddings: count(&[
                "max_position_embeddings",
                "n_positions",
                "max_sequence_length",
            ]),
            num_key_value_heads: count(&["num_key_value_heads", "num_kv_heads"]),
            rope_theta: ["rope_theta", "rotary_emb_base"]
                .iter()
                .find_map(|k| obj.get(*k).and_then(Value::as_f64))
                .filter(|v| *v > 0.0),
        }
    }

    /// Parse a raw model config document from a JSON string
    pub fn from_hf_str(json: &str) -> anyhow::Result<Self> {
        let doc: Value = serde_json::from_str(json)?;
        Ok(Self::from_hf_json(&doc))
    }

    /// Names of the fields weight estimation needs but this config lacks
    pub fn missing_weight_fields(&self) -> Vec<&'static str> {
        let resolved = self.resolve();
        let mut missing = Vec::new();
        if resolved.vocab_size.is_none() {
            missing.push("vocab_size");
        }
        if resolved.hidden_size.is_none() {
            missing.push("hidden_size");
        }
        if resolved.num_layers.is_none() {
            missing.push("num_hidden_layers");
        }
        missing
    }
}

fn unwrap_data_envelope(doc: &Value) -> &Value {
    let looks_like_config = ["vocab_size", "hidden_size", "model_type"]
        .iter()
        .any(|k| doc.get(*k).is_some_and(|v| !v.is_null()));

    match doc.get("Data") {
        Some(inner) if !looks_like_config && inner.is_object() => inner,
        _ => doc,
    }
}

fn as_positive_count(value: &Value) -> Option<u64> {
    value
        .as_u64()
        .or_else(|| {
            value
                .as_f64()
                .filter(|f| f.fract() == 0.0 && *f >= 0.0)
                .map(|f| f as u64)
        })
        .filter(|&n| n > 0)
}

const fn preset(
    hidden_size: u64,
    num_hidden_layers: u64,
    num_attention_heads: u64,
    num_key_value_heads: u64,
    intermediate_size: u64,
) -> ArchitectureConfig {
    ArchitectureConfig {
        vocab_size: Some(151936),
        hidden_size: Some(hidden_size),
        num_hidden_layers: Some(num_hidden_layers),
        num_attention_heads: Some(num_attention_heads),
        intermediate_size: Some(intermediate_size),
        max_position_embeddings: None,
        num_key_value_heads: Some(num_key_value_heads),
        rope_theta: None,
    }
}

/// Architecture presets keyed by the upper bound (in billions of
/// parameters) of the size band they stand in for. Qwen2.5-family shapes.
pub const PARAM_SIZE_PRESETS: [(f64, ArchitectureConfig); 6] = [
    (1.0, preset(1536, 28, 12, 2, 8960)),
    (3.0, preset(2048, 28, 16, 2, 11008)),
    (7.0, preset(4096, 28, 28, 4, 14336)),
    (14.0, preset(5120, 40, 40, 8, 13824)),
    (32.0, preset(6656, 64, 52, 8, 17920)),
    (f64::INFINITY, preset(8192, 80, 64, 8, 29568)),
];

/// Coarse lookup: the first band whose upper bound is `>= params_billions`
pub fn preset_for_billions(params_billions: f64) -> ArchitectureConfig {
    PARAM_SIZE_PRESETS
        .iter()
        .find(|(upper, _)| params_billions <= *upper)
        .map(|(_, config)| config.clone())
        .unwrap_or_else(|| PARAM_SIZE_PRESETS[PARAM_SIZE_PRESETS.len() - 1].1.clone())
}
