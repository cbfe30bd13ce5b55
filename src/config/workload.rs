use crate::memory_estimator::EstimateError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Numeric precision used for weights, KV cache and activations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Precision {
    Fp32,
    Fp16,
    Int8,
    Int4,
}

impl Precision {
    pub const ALL: [Precision; 4] = [
        Precision::Fp32,
        Precision::Fp16,
        Precision::Int8,
        Precision::Int4,
    ];

    /// Bytes per parameter / element
    pub fn bytes(self) -> f64 {
        match self {
            Precision::Fp32 => 4.0,
            Precision::Fp16 => 2.0,
            Precision::Int8 => 1.0,
            Precision::Int4 => 0.5,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Precision::Fp32 => "fp32",
            Precision::Fp16 => "fp16",
            Precision::Int8 => "int8",
            Precision::Int4 => "int4",
        }
    }
}

impl Default for Precision {
    fn default() -> Self {
        Precision::Fp16
    }
}

impl fmt::Display for Precision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Precision {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fp32" | "f32" => Ok(Precision::Fp32),
            "fp16" | "f16" | "bf16" => Ok(Precision::Fp16),
            "int8" | "q8" => Ok(Precision::Int8),
            "int4" | "q4" => Ok(Precision::Int4),
            other => anyhow::bail!(
                "Unknown precision: {}. Available: fp32, fp16, int8, int4",
                other
            ),
        }
    }
}

/// Workload profile for a single calculation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkloadParams {
    pub precision: Precision,
    pub batch_size: usize,
    pub sequence_length: usize,
    pub is_training: bool,
}

impl Default for WorkloadParams {
    fn default() -> Self {
        Self {
            precision: Precision::Fp16,
            batch_size: 1,
            sequence_length: 2048,
            is_training: false,
        }
    }
}

impl WorkloadParams {
    pub fn inference(precision: Precision, batch_size: usize, sequence_length: usize) -> Self {
        Self {
            precision,
            batch_size,
            sequence_length,
            is_training: false,
        }
    }

    pub fn training(precision: Precision, batch_size: usize, sequence_length: usize) -> Self {
        Self {
            is_training: true,
            ..Self::inference(precision, batch_size, sequence_length)
        }
    }

    /// Batch size and sequence length must both be positive
    pub fn validate(&self) -> Result<(), EstimateError> {
        if self.batch_size == 0 {
            return Err(EstimateError::InvalidWorkload("batch size"));
        }
        if self.sequence_length == 0 {
            return Err(EstimateError::InvalidWorkload("sequence length"));
        }
        Ok(())
    }
}

/// Deployment scenario used to pre-filter the GPU catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum UseCase {
    Inference,
    Training,
    Development,
}

impl UseCase {
    /// Only the training use case sizes against the training total
    pub fn is_training(self) -> bool {
        matches!(self, UseCase::Training)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precision_bytes() {
        assert_eq!(Precision::Fp32.bytes(), 4.0);
        assert_eq!(Precision::Fp16.bytes(), 2.0);
        assert_eq!(Precision::Int8.bytes(), 1.0);
        assert_eq!(Precision::Int4.bytes(), 0.5);
    }

    #[test]
    fn test_precision_parse() {
        assert_eq!("FP16".parse::<Precision>().unwrap(), Precision::Fp16);
        assert_eq!("int4".parse::<Precision>().unwrap(), Precision::Int4);
        assert!("fp8".parse::<Precision>().is_err());
    }

    #[test]
    fn test_precision_serde_lowercase() {
        let json = serde_json::to_string(&Precision::Int8).unwrap();
        assert_eq!(json, "\"int8\"");
    }

    #[test]
    fn test_default_workload() {
        let params = WorkloadParams::default();
        assert_eq!(params.precision, Precision::Fp16);
        assert_eq!(params.batch_size, 1);
        assert_eq!(params.sequence_length, 2048);
        assert!(!params.is_training);
    }

    #[test]
    fn test_validate() {
        assert!(WorkloadParams::default().validate().is_ok());
        assert_eq!(
            WorkloadParams::inference(Precision::Fp16, 0, 0).validate(),
            Err(EstimateError::InvalidWorkload("batch size"))
        );
        assert_eq!(
            WorkloadParams::inference(Precision::Fp16, 4, 0).validate(),
            Err(EstimateError::InvalidWorkload("sequence length"))
        );
    }

    #[test]
    fn test_training_constructor() {
        let params = WorkloadParams::training(Precision::Fp32, 4, 512);
        assert!(params.is_training);
        assert_eq!(params.batch_size, 4);
    }
}
