//! GPU memory estimation for transformer LLMs
//!
//! Converts an [`ArchitectureConfig`] and a [`WorkloadParams`] profile into a
//! per-component memory breakdown:
//!
//! ```text
//! weights     = (V·H + L·(4H² + 3H·F + 2H)) × bytes
//! kv_cache    = 2 · L · B · S · kv_heads · (H / heads) × bytes
//! activations = B · S · (3H + F) · L × bytes
//! optimizer   = 2 × weights                      (training only)
//!
//! inference   = 1.2 × (weights + kv_cache + 0.5 × activations)
//! training    = 1.2 × (weights + kv_cache + activations + optimizer)
//! ```
//!
//! Output-layer weights are assumed tied to the embedding and not counted
//! twice. Every figure is in GB (1024³ bytes), rounded to two decimals.

use crate::config::{preset_for_billions, ArchitectureConfig, Precision, WorkloadParams};
use crate::utils::{bytes_to_gb, round2};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Multiplier applied to the inference/training aggregates
pub const SAFETY_MARGIN: f64 = 1.2;

/// Share of activations kept live during inference
pub const INFERENCE_ACTIVATION_FACTOR: f64 = 0.5;

/// AdamW keeps two moment buffers per parameter
pub const OPTIMIZER_STATE_FACTOR: f64 = 2.0;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EstimateError {
    #[error(
        "model config is incomplete (missing {}); provide a config.json with these fields or a parameter count such as \"7B\"",
        .0.join(", ")
    )]
    IncompleteConfig(Vec<&'static str>),

    #[error("cannot read a parameter count from {0:?}; expected a label such as \"7B\" or \"0.5B\"")]
    InvalidParamLabel(String),

    #[error("no architecture config and no parameter count available for model {0}")]
    Unresolvable(String),

    #[error("{0} must be at least 1")]
    InvalidWorkload(&'static str),
}

/// Memory requirement breakdown in GB.
///
/// The component fields carry no safety margin; `inference`, `training` and
/// `total` do.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryRequirement {
    pub model_weights: f64,
    pub kv_cache: f64,
    pub activations: f64,
    pub optimizer: f64,
    /// `training` when the workload trains, else `inference`
    pub total: f64,
    pub inference: f64,
    pub training: f64,
}

impl MemoryRequirement {
    /// The aggregate a GPU has to hold for the given mode
    pub fn required_gb(&self, is_training: bool) -> f64 {
        if is_training {
            self.training
        } else {
            self.inference
        }
    }
}

/// Estimated parameter count (embedding plus transformer blocks)
pub fn estimate_parameter_count(config: &ArchitectureConfig) -> Result<f64, EstimateError> {
    let arch = config.resolve();
    let (Some(vocab), Some(hidden), Some(layers)) =
        (arch.vocab_size, arch.hidden_size, arch.num_layers)
    else {
        return Err(EstimateError::IncompleteConfig(config.missing_weight_fields()));
    };

    let vocab = vocab as f64;
    let hidden = hidden as f64;
    let layers = layers as f64;
    // ffn_size is only absent here when 4 * hidden overflows u64
    let ffn = arch.ffn_size.map(|f| f as f64).unwrap_or(hidden * 4.0);

    let embedding_params = vocab * hidden;
    let per_layer_params = 4.0 * hidden * hidden // Q, K, V, O
        + 3.0 * hidden * ffn // gate, up, down
        + 2.0 * hidden; // two norms

    Ok(embedding_params + layers * per_layer_params)
}

/// Model weight memory in GB.
///
/// Fails with [`EstimateError::IncompleteConfig`] when vocab size, hidden
/// size or layer count is missing.
pub fn calculate_model_weights(
    config: &ArchitectureConfig,
    precision: Precision,
) -> Result<f64, EstimateError> {
    let params = estimate_parameter_count(config)?;
    Ok(round2(bytes_to_gb(params * precision.bytes())))
}

/// KV cache memory in GB, or 0 when hidden size, layer count or head count
/// is unknown.
pub fn calculate_kv_cache(config: &ArchitectureConfig, workload: &WorkloadParams) -> f64 {
    let arch = config.resolve();
    let (Some(hidden), Some(layers), Some(heads), Some(kv_heads)) = (
        arch.hidden_size,
        arch.num_layers,
        arch.num_attention_heads,
        arch.kv_heads,
    ) else {
        debug!("KV cache estimate skipped: hidden size, layer count or head count unknown");
        return 0.0;
    };

    let head_dim = hidden as f64 / heads as f64;
    let elements = 2.0
        * layers as f64
        * workload.batch_size as f64
        * workload.sequence_length as f64
        * kv_heads as f64
        * head_dim;

    round2(bytes_to_gb(elements * workload.precision.bytes()))
}

/// Activation memory in GB, or 0 when hidden size or layer count is unknown.
///
/// Four buffers per layer: block input, attention output, FFN intermediate
/// and FFN output.
pub fn calculate_activations(config: &ArchitectureConfig, workload: &WorkloadParams) -> f64 {
    let arch = config.resolve();
    let (Some(hidden), Some(layers), Some(ffn)) = (arch.hidden_size, arch.num_layers, arch.ffn_size)
    else {
        debug!("Activation estimate skipped: hidden size or layer count unknown");
        return 0.0;
    };

    let hidden = hidden as f64;
    let per_token = hidden + hidden + ffn as f64 + hidden;
    let elements = workload.batch_size as f64
        * workload.sequence_length as f64
        * per_token
        * layers as f64;

    round2(bytes_to_gb(elements * workload.precision.bytes()))
}

/// Optimizer state memory in GB (0 unless training).
///
/// Reuses the weight figure at the workload precision rather than the
/// fp32 master copy real optimizers keep.
pub fn calculate_optimizer_states(model_weights_gb: f64, is_training: bool) -> f64 {
    if !is_training {
        return 0.0;
    }
    round2(model_weights_gb * OPTIMIZER_STATE_FACTOR)
}

/// Full breakdown for a config and workload
pub fn calculate_total_memory(
    config: &ArchitectureConfig,
    workload: &WorkloadParams,
) -> Result<MemoryRequirement, EstimateError> {
    workload.validate()?;
    let model_weights = calculate_model_weights(config, workload.precision)?;
    let kv_cache = calculate_kv_cache(config, workload);
    let activations = calculate_activations(config, workload);
    let optimizer = calculate_optimizer_states(model_weights, workload.is_training);

    let inference = model_weights + kv_cache + activations * INFERENCE_ACTIVATION_FACTOR;
    let training = model_weights + kv_cache + activations + optimizer;
    let total = if workload.is_training {
        training
    } else {
        inference
    };

    let requirement = MemoryRequirement {
        model_weights,
        kv_cache,
        activations,
        optimizer,
        total: round2(total * SAFETY_MARGIN),
        inference: round2(inference * SAFETY_MARGIN),
        training: round2(training * SAFETY_MARGIN),
    };

    debug!(
        precision = %workload.precision,
        batch_size = workload.batch_size,
        sequence_length = workload.sequence_length,
        training = workload.is_training,
        total_gb = requirement.total,
        "memory requirement estimated"
    );

    Ok(requirement)
}

static LEADING_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+\.?\d*|\.\d+)").expect("valid regex"));

/// Numeric value of a parameter-count label.
///
/// Every character other than digits and `.` is dropped, then the longest
/// leading decimal is read: `"7B"` → 7, `"0.5B"` → 0.5, `"8x7B"` → 87.
pub fn parse_param_label(label: &str) -> Result<f64, EstimateError> {
    let digits: String = label
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();

    LEADING_NUMBER
        .find(&digits)
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .ok_or_else(|| EstimateError::InvalidParamLabel(label.to_string()))
}

/// Stand-in architecture for a model known only by its parameter count.
///
/// Coarse band lookup (≤1, ≤3, ≤7, ≤14, ≤32, >32 billion), not an
/// interpolation.
pub fn estimate_config_from_params(param_label: &str) -> Result<ArchitectureConfig, EstimateError> {
    let billions = parse_param_label(param_label)?;
    let config = preset_for_billions(billions);
    debug!(
        label = param_label,
        billions,
        hidden_size = ?config.hidden_size,
        "using preset architecture for parameter count"
    );
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn qwen_7b() -> ArchitectureConfig {
        ArchitectureConfig {
            vocab_size: Some(151936),
            hidden_size: Some(4096),
            num_hidden_layers: Some(28),
            num_attention_heads: Some(28),
            num_key_value_heads: Some(4),
            intermediate_size: Some(14336),
            ..Default::default()
        }
    }

    fn expected_weights_gb(bytes: f64) -> f64 {
        let h = 4096.0_f64;
        let params = 151936.0 * h + 28.0 * (4.0 * h * h + 3.0 * h * 14336.0 + 2.0 * h);
        round2(params * bytes / (1024.0 * 1024.0 * 1024.0))
    }

    #[test]
    fn test_model_weights_fp16() {
        let weights = calculate_model_weights(&qwen_7b(), Precision::Fp16).unwrap();
        assert_eq!(weights, expected_weights_gb(2.0));
        // 7,434,108,928 params × 2 bytes
        assert_eq!(weights, 13.85);
    }

    #[test]
    fn test_model_weights_scale_with_precision() {
        let config = qwen_7b();
        for precision in Precision::ALL {
            let weights = calculate_model_weights(&config, precision).unwrap();
            assert_eq!(weights, expected_weights_gb(precision.bytes()));
        }
    }

    #[test]
    fn test_model_weights_incomplete_config() {
        let config = ArchitectureConfig {
            hidden_size: Some(4096),
            num_hidden_layers: Some(32),
            ..Default::default()
        };
        let err = calculate_model_weights(&config, Precision::Fp16).unwrap_err();
        assert_eq!(err, EstimateError::IncompleteConfig(vec!["vocab_size"]));
        assert!(err.to_string().contains("vocab_size"));
    }

    #[test]
    fn test_model_weights_default_ffn() {
        let config = ArchitectureConfig {
            vocab_size: Some(1000),
            hidden_size: Some(64),
            num_hidden_layers: Some(2),
            ..Default::default()
        };
        let params = estimate_parameter_count(&config).unwrap();
        let expected = 1000.0 * 64.0 + 2.0 * (4.0 * 64.0 * 64.0 + 3.0 * 64.0 * 256.0 + 2.0 * 64.0);
        assert_eq!(params, expected);
    }

    #[test]
    fn test_huge_hidden_size_does_not_overflow() {
        let config = ArchitectureConfig {
            vocab_size: Some(1000),
            hidden_size: Some(u64::MAX / 2),
            num_hidden_layers: Some(1),
            ..Default::default()
        };
        let params = estimate_parameter_count(&config).unwrap();
        assert!(params.is_finite() && params > 0.0);
    }

    #[test]
    fn test_kv_cache_gqa() {
        let workload = WorkloadParams::inference(Precision::Fp16, 1, 2048);
        let kv = calculate_kv_cache(&qwen_7b(), &workload);
        let head_dim = 4096.0 / 28.0;
        let elements = 2.0 * 28.0 * 1.0 * 2048.0 * 4.0 * head_dim;
        assert_eq!(kv, round2(elements * 2.0 / (1024.0 * 1024.0 * 1024.0)));
    }

    #[test]
    fn test_kv_cache_without_kv_heads_uses_attention_heads() {
        let mut config = qwen_7b();
        config.num_key_value_heads = None;
        let workload = WorkloadParams::inference(Precision::Fp32, 2, 4096);
        // Full MHA: kv_heads * head_dim == hidden_size
        let elements = 2.0 * 28.0 * 2.0 * 4096.0 * 4096.0;
        assert_eq!(
            calculate_kv_cache(&config, &workload),
            round2(elements * 4.0 / (1024.0 * 1024.0 * 1024.0))
        );
    }

    #[test]
    fn test_kv_cache_missing_heads_is_zero() {
        let mut config = qwen_7b();
        config.num_attention_heads = None;
        config.num_key_value_heads = None;
        assert_eq!(calculate_kv_cache(&config, &WorkloadParams::default()), 0.0);
    }

    #[test]
    fn test_activations() {
        let workload = WorkloadParams::inference(Precision::Fp16, 1, 2048);
        let acts = calculate_activations(&qwen_7b(), &workload);
        let elements = 2048.0 * (3.0 * 4096.0 + 14336.0) * 28.0;
        assert_eq!(acts, round2(elements * 2.0 / (1024.0 * 1024.0 * 1024.0)));
    }

    #[test]
    fn test_activations_missing_layers_is_zero() {
        let config = ArchitectureConfig {
            hidden_size: Some(4096),
            ..Default::default()
        };
        assert_eq!(calculate_activations(&config, &WorkloadParams::default()), 0.0);
    }

    #[test]
    fn test_optimizer_states() {
        assert_eq!(calculate_optimizer_states(13.28, false), 0.0);
        assert_eq!(calculate_optimizer_states(13.28, true), 26.56);
    }

    #[test]
    fn test_total_memory_inference() {
        let config = qwen_7b();
        let workload = WorkloadParams::inference(Precision::Fp16, 1, 2048);
        let req = calculate_total_memory(&config, &workload).unwrap();

        assert_eq!(req.optimizer, 0.0);
        let inference_raw = req.model_weights + req.kv_cache + req.activations * 0.5;
        let training_raw = req.model_weights + req.kv_cache + req.activations;
        assert_eq!(req.inference, round2(inference_raw * 1.2));
        assert_eq!(req.training, round2(training_raw * 1.2));
        assert_eq!(req.total, req.inference);
        assert!((req.inference - 18.48).abs() < 0.011, "got {}", req.inference);
    }

    #[test]
    fn test_total_memory_training() {
        let config = qwen_7b();
        let workload = WorkloadParams::training(Precision::Fp16, 2, 1024);
        let req = calculate_total_memory(&config, &workload).unwrap();

        assert_eq!(req.optimizer, round2(req.model_weights * 2.0));
        let training_raw = req.model_weights + req.kv_cache + req.activations + req.optimizer;
        assert_eq!(req.training, round2(training_raw * 1.2));
        assert_eq!(req.total, req.training);
        assert!(req.training > req.inference);
    }

    #[test]
    fn test_total_memory_propagates_incomplete_config() {
        let result = calculate_total_memory(&ArchitectureConfig::default(), &WorkloadParams::default());
        assert!(matches!(result, Err(EstimateError::IncompleteConfig(_))));
    }

    #[test]
    fn test_total_memory_rejects_empty_workload() {
        let config = qwen_7b();
        let no_batch = WorkloadParams::inference(Precision::Fp16, 0, 2048);
        assert_eq!(
            calculate_total_memory(&config, &no_batch).unwrap_err(),
            EstimateError::InvalidWorkload("batch size")
        );

        let no_tokens = WorkloadParams::training(Precision::Fp16, 1, 0);
        let err = calculate_total_memory(&config, &no_tokens).unwrap_err();
        assert_eq!(err.to_string(), "sequence length must be at least 1");
    }

    #[test]
    fn test_parse_param_label() {
        assert_eq!(parse_param_label("7B").unwrap(), 7.0);
        assert_eq!(parse_param_label("0.5B").unwrap(), 0.5);
        assert_eq!(parse_param_label(" 14 b ").unwrap(), 14.0);
        assert_eq!(parse_param_label("8x7B").unwrap(), 87.0);
        assert!(parse_param_label("large").is_err());
        assert!(parse_param_label("").is_err());
    }

    #[test]
    fn test_estimate_config_from_params_7b() {
        let config = estimate_config_from_params("7B").unwrap();
        assert_eq!(config, qwen_7b());
    }

    #[test]
    fn test_estimate_config_from_params_bands() {
        let cases = [
            ("0.5B", 1536, 28, 12, 2, 8960),
            ("3B", 2048, 28, 16, 2, 11008),
            ("13B", 5120, 40, 40, 8, 13824),
            ("32B", 6656, 64, 52, 8, 17920),
            ("70B", 8192, 80, 64, 8, 29568),
        ];
        for (label, hidden, layers, heads, kv, ffn) in cases {
            let config = estimate_config_from_params(label).unwrap();
            assert_eq!(config.vocab_size, Some(151936), "{}", label);
            assert_eq!(config.hidden_size, Some(hidden), "{}", label);
            assert_eq!(config.num_hidden_layers, Some(layers), "{}", label);
            assert_eq!(config.num_attention_heads, Some(heads), "{}", label);
            assert_eq!(config.num_key_value_heads, Some(kv), "{}", label);
            assert_eq!(config.intermediate_size, Some(ffn), "{}", label);
        }
    }

    #[test]
    fn test_estimate_config_invalid_label() {
        let err = estimate_config_from_params("unknown").unwrap_err();
        assert_eq!(err, EstimateError::InvalidParamLabel("unknown".to_string()));
    }
}
