//! CLI command implementations

use super::{ModelArgs, WorkloadArgs};
use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;
use vram_advisor::config::{ArchitectureConfig, Config, UseCase, WorkloadParams};
use vram_advisor::hardware::{
    calculate_multi_gpu_config, get_gpu_by_use_case, get_gpu_recommendations, GpuCatalog,
    GpuRecommendation,
};
use vram_advisor::memory_estimator::{
    calculate_total_memory, estimate_config_from_params, estimate_parameter_count,
    MemoryRequirement,
};
use vram_advisor::model::{
    estimate_model_size, extract_param_count_from_readme, list_model_files, read_config_file,
    ChainedConfigSource, ConfigSource, HfCacheConfigSource, ModelCatalog, ModelEntry,
};
use vram_advisor::utils::format_bytes;

pub struct GlobalOpts {
    pub config: PathBuf,
    pub gpu_catalog: Option<PathBuf>,
    pub model_catalog: Option<PathBuf>,
    pub json: bool,
}

/// Settings plus the catalogs they point at
struct Session {
    config: Config,
    json: bool,
    gpu_catalog: GpuCatalog,
    model_catalog: ModelCatalog,
}

impl Session {
    fn open(opts: &GlobalOpts) -> Result<Self> {
        let config = Config::load_or_default(Some(&opts.config))?;

        let gpu_path = opts
            .gpu_catalog
            .clone()
            .or_else(|| config.catalog.gpu_catalog.as_ref().map(PathBuf::from));
        let gpu_catalog = match gpu_path {
            Some(path) => GpuCatalog::load(path)?,
            None => GpuCatalog::builtin().clone(),
        };

        let model_path = opts
            .model_catalog
            .clone()
            .or_else(|| config.catalog.model_catalog.as_ref().map(PathBuf::from));
        let model_catalog = match model_path {
            Some(path) => ModelCatalog::load(path)?,
            None => ModelCatalog::builtin().clone(),
        };

        Ok(Self {
            json: opts.json || config.json_output,
            config,
            gpu_catalog,
            model_catalog,
        })
    }

    /// CLI flags over settings-file defaults
    fn workload(&self, args: &WorkloadArgs) -> WorkloadParams {
        let defaults = &self.config.workload;
        WorkloadParams {
            precision: args.precision.unwrap_or(defaults.precision),
            batch_size: args.batch_size.map_or(defaults.batch_size, |n| n.get()),
            sequence_length: args.seq_len.map_or(defaults.sequence_length, |n| n.get()),
            is_training: args.training || defaults.is_training,
        }
    }

    /// Architecture from `--config-file`, `--params` or `--model`, in that order
    fn architecture(&self, args: &ModelArgs) -> Result<(String, ArchitectureConfig)> {
        if let Some(path) = &args.config_file {
            let json = fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let config = ArchitectureConfig::from_hf_str(&json)
                .with_context(|| format!("Invalid model config {}", path.display()))?;
            return Ok((path.display().to_string(), config));
        }

        if let Some(label) = &args.params {
            return Ok((format!("{} parameters", label), estimate_config_from_params(label)?));
        }

        let Some(id) = &args.model else {
            bail!("Specify a model with --model, --params or --config-file");
        };

        let entry = match self.model_catalog.get(id) {
            Some(entry) => entry.clone(),
            None if id.contains('/') => ModelEntry::custom(id),
            None => bail!(
                "Unknown model '{}'. Run 'vram-advisor models' to list the catalog, or pass a repo id (org/name)",
                id
            ),
        };

        let mut sources: Vec<Box<dyn ConfigSource>> = Vec::new();
        if let Some(cache) = HfCacheConfigSource::from_env() {
            sources.push(Box::new(cache));
        }
        let config = entry.resolve_with(&ChainedConfigSource::new(sources))?;
        Ok((entry.name.clone(), config))
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EstimateReport<'a> {
    model: &'a str,
    workload: &'a WorkloadParams,
    parameter_count: f64,
    memory: &'a MemoryRequirement,
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_header(title: &str) {
    println!("╔═══════════════════════════════════════════════════════════════╗");
    println!("║  {:<61}║", title);
    println!("╚═══════════════════════════════════════════════════════════════╝");
    println!();
}

fn print_workload(model: &str, workload: &WorkloadParams) {
    println!("Model:      {}", model);
    println!(
        "Workload:   {} | batch {} | {} tokens | {}",
        workload.precision,
        workload.batch_size,
        workload.sequence_length,
        if workload.is_training {
            "training"
        } else {
            "inference"
        }
    );
    println!();
}

fn print_recommendation(rank: usize, rec: &GpuRecommendation) {
    println!(
        "  {}. {:<32} {:>5}GB  {:>6.1}%  [{}]",
        rank,
        rec.gpu.name,
        rec.gpu.memory,
        rec.utilization_rate,
        rec.suitability.as_str()
    );
    for reason in &rec.reasons {
        println!("       ✓ {}", reason);
    }
    for warning in &rec.warnings {
        println!("       ⚠️  {}", warning);
    }
}

fn print_group(title: &str, recs: &[GpuRecommendation]) {
    println!("{}", title);
    println!("{}", "━".repeat(64));
    if recs.is_empty() {
        println!("  (none)");
    }
    for (i, rec) in recs.iter().enumerate() {
        print_recommendation(i + 1, rec);
    }
    println!();
}

pub fn estimate(opts: &GlobalOpts, model: &ModelArgs, workload: &WorkloadArgs) -> Result<()> {
    let session = Session::open(opts)?;
    let workload = session.workload(workload);
    let (name, arch) = session.architecture(model)?;

    let parameter_count = estimate_parameter_count(&arch)?;
    let memory = calculate_total_memory(&arch, &workload)?;
    info!(model = %name, total_gb = memory.total, "estimate complete");

    if session.json {
        return print_json(&EstimateReport {
            model: &name,
            workload: &workload,
            parameter_count,
            memory: &memory,
        });
    }

    print_header("GPU MEMORY ESTIMATE");
    print_workload(&name, &workload);
    println!("Parameters:      {:.2}B", parameter_count / 1e9);
    println!("Model weights:   {:>8.2} GB", memory.model_weights);
    println!("KV cache:        {:>8.2} GB", memory.kv_cache);
    println!("Activations:     {:>8.2} GB", memory.activations);
    println!("Optimizer:       {:>8.2} GB", memory.optimizer);
    println!("{}", "━".repeat(32));
    println!("Inference total: {:>8.2} GB", memory.inference);
    println!("Training total:  {:>8.2} GB", memory.training);
    println!();
    println!("Required:        {:>8.2} GB (includes 20% safety margin)", memory.total);

    Ok(())
}

pub fn recommend(opts: &GlobalOpts, model: &ModelArgs, workload: &WorkloadArgs) -> Result<()> {
    let session = Session::open(opts)?;
    let workload = session.workload(workload);
    let (name, arch) = session.architecture(model)?;

    let memory = calculate_total_memory(&arch, &workload)?;
    let result = get_gpu_recommendations(&session.gpu_catalog, &memory, workload.is_training);

    if session.json {
        return print_json(&result);
    }

    print_header("GPU RECOMMENDATIONS");
    print_workload(&name, &workload);
    println!(
        "Required memory: {:.2} GB",
        memory.required_gb(workload.is_training)
    );
    println!();

    print_group("RECOMMENDED", &result.recommended);
    print_group("BUDGET", &result.budget);
    print_group("PROFESSIONAL", &result.professional);

    if let Some(plan) = &result.multi_gpu {
        println!("MULTI-GPU OPTION");
        println!("{}", "━".repeat(64));
        println!(
            "  {} GPUs, {}GB total memory",
            plan.gpu_count, plan.total_memory
        );
        for (i, rec) in plan.recommendations.iter().enumerate() {
            print_recommendation(i + 1, rec);
        }
        println!();
    }

    if result.recommended.is_empty() && result.multi_gpu.is_none() {
        println!("No GPU in the catalog can hold this workload.");
        println!("Try lower precision (--precision int8 / int4) or a shorter --seq-len.");
    }

    Ok(())
}

pub fn use_case(
    opts: &GlobalOpts,
    use_case: UseCase,
    model: &ModelArgs,
    workload: &WorkloadArgs,
) -> Result<()> {
    let session = Session::open(opts)?;
    let mut workload = session.workload(workload);
    workload.is_training = use_case.is_training();
    let (name, arch) = session.architecture(model)?;

    let memory = calculate_total_memory(&arch, &workload)?;
    let recs = get_gpu_by_use_case(&session.gpu_catalog, use_case, &memory);

    if session.json {
        return print_json(&recs);
    }

    print_header(&format!("GPUS FOR {:?}", use_case).to_uppercase());
    print_workload(&name, &workload);
    print_group("CANDIDATES", &recs);

    Ok(())
}

pub fn multi_gpu(
    opts: &GlobalOpts,
    gpu: &str,
    model: &ModelArgs,
    workload: &WorkloadArgs,
) -> Result<()> {
    let session = Session::open(opts)?;
    let workload = session.workload(workload);
    let (name, arch) = session.architecture(model)?;

    let target = session
        .gpu_catalog
        .find(gpu)
        .ok_or_else(|| anyhow::anyhow!("Unknown GPU '{}'. Run 'vram-advisor gpus' to list the catalog", gpu))?;

    let memory = calculate_total_memory(&arch, &workload)?;
    let plan = calculate_multi_gpu_config(&memory, target, workload.is_training);

    if session.json {
        return print_json(&plan);
    }

    print_header("MULTI-GPU PLAN");
    print_workload(&name, &workload);
    println!("GPU:               {} ({}GB)", target.name, target.memory);
    println!("GPUs needed:       {}", plan.gpu_count);
    println!("Total memory:      {} GB", plan.total_memory);
    println!("Utilization:       {:.2}%", plan.utilization_rate);
    println!("Estimated speedup: {:.2}x", plan.estimated_speedup);
    for warning in &plan.warnings {
        println!("⚠️  {}", warning);
    }

    Ok(())
}

pub fn list_gpus(opts: &GlobalOpts) -> Result<()> {
    let session = Session::open(opts)?;

    if session.json {
        return print_json(&session.gpu_catalog.gpus());
    }

    print_header("GPU CATALOG");
    println!(
        "  {:<20} {:<32} {:>6} {:>6} {:>14} {:>6}",
        "ID", "NAME", "MEM", "CC", "PRICE", "POWER"
    );
    println!("{}", "━".repeat(92));
    for gpu in session.gpu_catalog.gpus() {
        println!(
            "  {:<20} {:<32} {:>4}GB {:>6} {:>14} {:>5}W",
            gpu.id, gpu.name, gpu.memory, gpu.compute_capability, gpu.price_range, gpu.power_consumption
        );
    }

    Ok(())
}

pub fn list_models(opts: &GlobalOpts, search: Option<&str>) -> Result<()> {
    let session = Session::open(opts)?;
    let models: Vec<&ModelEntry> = match search {
        Some(term) => session.model_catalog.search(term),
        None => session.model_catalog.models().iter().collect(),
    };

    if session.json {
        return print_json(&models);
    }

    print_header("MODEL CATALOG");
    if models.is_empty() {
        println!("No models found.");
    }
    for model in models {
        println!(
            "  {:<40} {:>6}  {:<10} {}",
            model.id,
            model.parameters.as_deref().unwrap_or("?"),
            model.category,
            model.repo_id().unwrap_or("")
        );
        if !model.description.is_empty() {
            println!("      {}", model.description);
        }
    }

    Ok(())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InspectReport {
    files: usize,
    weights_gb: f64,
    readme_parameters: Option<String>,
    config: Option<ArchitectureConfig>,
    missing_fields: Vec<&'static str>,
}

pub fn inspect(opts: &GlobalOpts, dir: &Path) -> Result<()> {
    let session = Session::open(opts)?;
    let files = list_model_files(dir)
        .with_context(|| format!("Failed to list model directory {}", dir.display()))?;
    let readme = fs::read_to_string(dir.join("README.md")).unwrap_or_default();
    let config = read_config_file(&dir.join("config.json"));

    let report = InspectReport {
        files: files.len(),
        weights_gb: estimate_model_size(&files),
        readme_parameters: extract_param_count_from_readme(&readme),
        missing_fields: config
            .as_ref()
            .map(ArchitectureConfig::missing_weight_fields)
            .unwrap_or_default(),
        config,
    };

    if session.json {
        return print_json(&report);
    }

    print_header("MODEL DIRECTORY");
    println!("Path: {}", dir.display());
    println!();
    for file in files.iter().filter(|f| f.is_weight_file()) {
        println!("  {:<48} {:>12}", file.path, format_bytes(file.size));
    }
    println!();
    println!("Weight files total:  {:.2} GB", report.weights_gb);
    match &report.readme_parameters {
        Some(label) => println!("README parameters:   {}", label),
        None => println!("README parameters:   not found"),
    }
    match &report.config {
        Some(_) if report.missing_fields.is_empty() => {
            println!("config.json:         complete");
        }
        Some(_) => println!(
            "config.json:         missing {}",
            report.missing_fields.join(", ")
        ),
        None => println!("config.json:         not found"),
    }

    Ok(())
}

pub fn init_config(output: &Path) -> Result<()> {
    if output.exists() {
        bail!("{} already exists", output.display());
    }
    Config::default().save(output)?;
    println!("✓ Wrote default settings to {}", output.display());
    Ok(())
}
