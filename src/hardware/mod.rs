pub mod catalog;
pub mod recommend;
pub mod scaling;

pub use catalog::{parse_price_range, GpuCatalog, GpuInfo};
pub use recommend::{
    evaluate_gpu_suitability, get_gpu_by_use_case, get_gpu_recommendations, matches_use_case,
    GpuRecommendation, MultiGpuPlan, RecommendationResult, Suitability, TARGET_UTILIZATION,
};
pub use scaling::{calculate_multi_gpu_config, estimate_speedup, MultiGpuConfig};
