//! GPU ranking and recommendation
//!
//! Every GPU in the catalog gets a [`GpuRecommendation`] for the given
//! memory requirement. Entries that cannot hold the model are dropped, the
//! rest are ranked by suitability tier and then by how close their
//! utilization sits to [`TARGET_UTILIZATION`].

use super::catalog::{GpuCatalog, GpuInfo};
use crate::config::UseCase;
use crate::memory_estimator::MemoryRequirement;
use crate::utils::round2;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::debug;

/// Midpoint of the 70-85% band the ranking prefers
pub const TARGET_UTILIZATION: f64 = 77.5;

const RECOMMENDED_LIMIT: usize = 3;
const USE_CASE_LIMIT: usize = 5;

const BUDGET_MAX_PRICE: f64 = 8000.0;
const PROFESSIONAL_MIN_MEMORY_GB: f64 = 40.0;
const MULTI_GPU_TRIGGER_UTILIZATION: f64 = 90.0;
const MULTI_GPU_MAX_PRICE: f64 = 20000.0;
const MULTI_GPU_MIN_MEMORY_GB: f64 = 12.0;

pub(crate) const MULTI_GPU_FRAMEWORK_WARNING: &str =
    "Requires a framework with multi-GPU parallelism support";

/// Verdict for one GPU, ordered worst to best
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Suitability {
    Insufficient,
    Marginal,
    Good,
    Perfect,
}

impl Suitability {
    /// Tier for a utilization percentage; thresholds are exclusive
    pub fn from_utilization(utilization: f64) -> Self {
        if utilization > 100.0 {
            Suitability::Insufficient
        } else if utilization > 90.0 {
            Suitability::Marginal
        } else if utilization > 70.0 {
            Suitability::Good
        } else {
            Suitability::Perfect
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Suitability::Insufficient => "insufficient",
            Suitability::Marginal => "marginal",
            Suitability::Good => "good",
            Suitability::Perfect => "perfect",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GpuRecommendation {
    pub gpu: GpuInfo,
    pub suitability: Suitability,
    /// Required memory as a percentage of GPU memory
    pub utilization_rate: f64,
    pub reasons: Vec<String>,
    pub warnings: Vec<String>,
}

/// Fallback plan when no single GPU is comfortable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiGpuPlan {
    pub gpu_count: u32,
    pub total_memory: f64,
    pub recommendations: Vec<GpuRecommendation>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationResult {
    pub recommended: Vec<GpuRecommendation>,
    pub budget: Vec<GpuRecommendation>,
    pub professional: Vec<GpuRecommendation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multi_gpu: Option<MultiGpuPlan>,
}

/// Rate a single GPU against the requirement
pub fn evaluate_gpu_suitability(
    gpu: &GpuInfo,
    requirement: &MemoryRequirement,
    is_training: bool,
) -> GpuRecommendation {
    let required_gb = requirement.required_gb(is_training);
    let utilization = required_gb / gpu.memory * 100.0;
    let suitability = Suitability::from_utilization(utilization);

    let mut reasons = Vec::new();
    let mut warnings = Vec::new();

    match suitability {
        Suitability::Insufficient => reasons.push(format!(
            "Insufficient memory: needs {:.1}GB, only {}GB available",
            required_gb, gpu.memory
        )),
        Suitability::Marginal => {
            reasons.push(format!("Tight memory: {:.1}% utilization", utilization));
            warnings.push("High memory utilization may affect stability".to_string());
        }
        Suitability::Good => {
            reasons.push(format!("Sufficient memory: {:.1}% utilization", utilization))
        }
        Suitability::Perfect => {
            reasons.push(format!("Ample memory: {:.1}% utilization", utilization))
        }
    }

    if let Some(cc) = gpu.compute_tier() {
        if cc >= 8.0 {
            reasons.push("Supports the latest compute features".to_string());
        } else if cc >= 7.0 {
            reasons.push("Supports modern compute features".to_string());
        } else {
            warnings.push("Older compute capability, may lack some optimizations".to_string());
        }
    }

    if gpu.power_consumption > 400.0 {
        warnings.push(format!("High power draw: {}W", gpu.power_consumption));
    }

    match gpu.mean_price() {
        Some(price) if price > 50000.0 => {
            reasons.push("Professional-grade card with strong performance".to_string())
        }
        Some(price) if price > 10000.0 => {
            reasons.push("High-end card with good value".to_string())
        }
        Some(_) => reasons.push("Excellent value for money".to_string()),
        None => debug!(gpu = %gpu.name, range = %gpu.price_range, "unparsable price range"),
    }

    GpuRecommendation {
        gpu: gpu.clone(),
        suitability,
        utilization_rate: round2(utilization),
        reasons,
        warnings,
    }
}

/// Tier descending, then closeness to the target utilization
fn rank_by_fit(a: &GpuRecommendation, b: &GpuRecommendation) -> Ordering {
    b.suitability.cmp(&a.suitability).then_with(|| {
        let a_score = (a.utilization_rate - TARGET_UTILIZATION).abs();
        let b_score = (b.utilization_rate - TARGET_UTILIZATION).abs();
        a_score.total_cmp(&b_score)
    })
}

fn eligible<'a, I>(gpus: I, requirement: &MemoryRequirement, is_training: bool) -> Vec<GpuRecommendation>
where
    I: IntoIterator<Item = &'a GpuInfo>,
{
    gpus.into_iter()
        .map(|gpu| evaluate_gpu_suitability(gpu, requirement, is_training))
        .filter(|rec| rec.suitability != Suitability::Insufficient)
        .collect()
}

/// Rank the whole catalog and split it into recommendation groups
pub fn get_gpu_recommendations(
    catalog: &GpuCatalog,
    requirement: &MemoryRequirement,
    is_training: bool,
) -> RecommendationResult {
    let mut suitable = eligible(catalog.gpus(), requirement, is_training);
    suitable.sort_by(rank_by_fit);

    debug!(
        catalog = catalog.len(),
        eligible = suitable.len(),
        required_gb = requirement.required_gb(is_training),
        "ranked GPU catalog"
    );

    let recommended = suitable.iter().take(RECOMMENDED_LIMIT).cloned().collect();

    let budget = suitable
        .iter()
        .filter(|rec| rec.gpu.mean_price().is_some_and(|p| p < BUDGET_MAX_PRICE))
        .take(RECOMMENDED_LIMIT)
        .cloned()
        .collect();

    let professional = suitable
        .iter()
        .filter(|rec| rec.gpu.is_professional() || rec.gpu.memory >= PROFESSIONAL_MIN_MEMORY_GB)
        .take(RECOMMENDED_LIMIT)
        .cloned()
        .collect();

    let needs_multi_gpu = suitable
        .first()
        .map_or(true, |top| top.utilization_rate > MULTI_GPU_TRIGGER_UTILIZATION);

    let multi_gpu = if needs_multi_gpu {
        plan_multi_gpu_fallback(catalog, requirement.required_gb(is_training))
    } else {
        None
    };

    RecommendationResult {
        recommended,
        budget,
        professional,
        multi_gpu,
    }
}

/// First mid-range catalog GPU, scaled out to cover the requirement
fn plan_multi_gpu_fallback(catalog: &GpuCatalog, required_gb: f64) -> Option<MultiGpuPlan> {
    let candidate = catalog.gpus().iter().find(|gpu| {
        gpu.mean_price().is_some_and(|p| p < MULTI_GPU_MAX_PRICE)
            && gpu.memory >= MULTI_GPU_MIN_MEMORY_GB
    });

    let Some(gpu) = candidate else {
        debug!("no mid-range GPU available for a multi-GPU plan");
        return None;
    };

    let gpu_count = gpus_needed(required_gb, gpu.memory);
    let total_memory = gpu_count as f64 * gpu.memory;

    debug!(gpu = %gpu.name, gpu_count, total_memory, "multi-GPU fallback planned");

    Some(MultiGpuPlan {
        gpu_count,
        total_memory,
        recommendations: vec![GpuRecommendation {
            gpu: gpu.clone(),
            suitability: Suitability::Good,
            utilization_rate: round2(required_gb / total_memory * 100.0),
            reasons: vec![format!(
                "{} GPUs in parallel, {}GB total memory",
                gpu_count, total_memory
            )],
            warnings: vec![MULTI_GPU_FRAMEWORK_WARNING.to_string()],
        }],
    })
}

/// `ceil(required / per_gpu)`, at least one card
pub(crate) fn gpus_needed(required_gb: f64, per_gpu_gb: f64) -> u32 {
    ((required_gb / per_gpu_gb).ceil() as u32).max(1)
}

/// Catalog filter for a deployment scenario
pub fn matches_use_case(gpu: &GpuInfo, use_case: UseCase) -> bool {
    match use_case {
        UseCase::Inference => !(gpu.is_professional() && gpu.memory > 24.0),
        UseCase::Training => gpu.compute_tier().unwrap_or(0.0) >= 7.0 && gpu.memory >= 16.0,
        UseCase::Development => {
            gpu.mean_price().is_some_and(|p| p < 15000.0) && gpu.memory >= 12.0
        }
    }
}

/// Up to five GPUs for a use case, best tier first
pub fn get_gpu_by_use_case(
    catalog: &GpuCatalog,
    use_case: UseCase,
    requirement: &MemoryRequirement,
) -> Vec<GpuRecommendation> {
    let filtered = catalog.gpus().iter().filter(|gpu| matches_use_case(gpu, use_case));
    let mut suitable = eligible(filtered, requirement, use_case.is_training());
    suitable.sort_by(|a, b| b.suitability.cmp(&a.suitability));
    suitable.truncate(USE_CASE_LIMIT);
    suitable
}
