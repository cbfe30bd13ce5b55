//! Multi-GPU scaling estimates

use super::catalog::GpuInfo;
use super::recommend::{gpus_needed, MULTI_GPU_FRAMEWORK_WARNING};
use crate::memory_estimator::MemoryRequirement;
use crate::utils::round2;
use serde::{Deserialize, Serialize};

/// Per-GPU efficiency never drops below this
const MIN_PARALLEL_EFFICIENCY: f64 = 0.7;

/// Efficiency lost per additional GPU
const EFFICIENCY_LOSS_PER_GPU: f64 = 0.1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiGpuConfig {
    pub gpu_count: u32,
    pub total_memory: f64,
    pub utilization_rate: f64,
    pub estimated_speedup: f64,
    pub warnings: Vec<String>,
}

/// Throughput relative to one GPU, with communication overhead
pub fn estimate_speedup(gpu_count: u32) -> f64 {
    if gpu_count <= 1 {
        return gpu_count as f64;
    }
    let n = gpu_count as f64;
    let efficiency = (1.0 - (n - 1.0) * EFFICIENCY_LOSS_PER_GPU).max(MIN_PARALLEL_EFFICIENCY);
    round2(n * efficiency)
}

/// How many `target_gpu` cards the requirement needs, and what that buys
pub fn calculate_multi_gpu_config(
    requirement: &MemoryRequirement,
    target_gpu: &GpuInfo,
    is_training: bool,
) -> MultiGpuConfig {
    let required_gb = requirement.required_gb(is_training);
    let gpu_count = gpus_needed(required_gb, target_gpu.memory);
    let total_memory = gpu_count as f64 * target_gpu.memory;

    let mut warnings = Vec::new();
    if gpu_count > 1 {
        warnings.push(MULTI_GPU_FRAMEWORK_WARNING.to_string());
        warnings.push("Inter-GPU communication may become a bottleneck".to_string());
    }
    if gpu_count > 4 {
        warnings.push("More than 4 GPUs requires dedicated server hardware".to_string());
    }

    MultiGpuConfig {
        gpu_count,
        total_memory,
        utilization_rate: round2(required_gb / total_memory * 100.0),
        estimated_speedup: estimate_speedup(gpu_count),
        warnings,
    }
}
