//! GPU memory estimation and hardware recommendations for LLMs
//!
//! Given a transformer's architecture config and a workload (precision,
//! batch size, sequence length, inference or training), this crate estimates
//! how much GPU memory the workload needs and ranks a GPU catalog against
//! that figure.
//!
//! ## Main Components
//!
//! - `memory_estimator`: Parameter count and memory breakdown
//! - `hardware`: GPU catalog, suitability ranking, multi-GPU planning
//! - `model`: Model catalog and architecture config sources
//! - `config`: Architecture, workload and CLI settings types

pub mod config;
pub mod hardware;
pub mod memory_estimator;
pub mod model;
pub mod utils;

pub use config::{ArchitectureConfig, Config, Precision, UseCase, WorkloadParams};
pub use hardware::{get_gpu_by_use_case, get_gpu_recommendations, GpuCatalog, RecommendationResult};
pub use memory_estimator::{calculate_total_memory, EstimateError, MemoryRequirement};

/// Library errors
pub use anyhow::{Error, Result};
