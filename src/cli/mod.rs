pub mod commands;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::num::NonZeroUsize;
use std::path::PathBuf;
use vram_advisor::config::{Precision, UseCase};

#[derive(Parser)]
#[command(name = "vram-advisor")]
#[command(about = "GPU memory estimation and hardware recommendations for LLMs", long_about = None)]
struct Cli {
    /// Settings file (JSON); missing file means defaults
    #[arg(long, global = true, default_value = "vram-advisor.json")]
    config: PathBuf,
    /// GPU catalog JSON, overrides the settings file and the built-in list
    #[arg(long, global = true)]
    gpu_catalog: Option<PathBuf>,
    /// Model catalog JSON, overrides the settings file and the built-in list
    #[arg(long, global = true)]
    model_catalog: Option<PathBuf>,
    /// Print JSON instead of a text report
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

/// Where the architecture comes from; first one given wins
#[derive(Args, Debug, Clone, Default)]
pub struct ModelArgs {
    /// Local config.json of the model
    #[arg(long)]
    pub config_file: Option<PathBuf>,
    /// Parameter count label, e.g. "7B"
    #[arg(long)]
    pub params: Option<String>,
    /// Catalog model id or HuggingFace repo id (org/name)
    #[arg(long)]
    pub model: Option<String>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct WorkloadArgs {
    #[arg(long, value_enum)]
    pub precision: Option<Precision>,
    #[arg(long)]
    pub batch_size: Option<NonZeroUsize>,
    /// Sequence length in tokens
    #[arg(long)]
    pub seq_len: Option<NonZeroUsize>,
    /// Size for training instead of inference
    #[arg(long)]
    pub training: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the memory breakdown for a model and workload
    Estimate {
        #[command(flatten)]
        model: ModelArgs,
        #[command(flatten)]
        workload: WorkloadArgs,
    },
    /// Recommend GPUs for a model and workload
    Recommend {
        #[command(flatten)]
        model: ModelArgs,
        #[command(flatten)]
        workload: WorkloadArgs,
    },
    /// Recommend GPUs for a deployment scenario
    UseCase {
        #[arg(value_enum)]
        use_case: UseCase,
        #[command(flatten)]
        model: ModelArgs,
        #[command(flatten)]
        workload: WorkloadArgs,
    },
    /// Plan a multi-GPU setup on a given card
    MultiGpu {
        /// GPU id or name from the catalog
        #[arg(long)]
        gpu: String,
        #[command(flatten)]
        model: ModelArgs,
        #[command(flatten)]
        workload: WorkloadArgs,
    },
    /// List the GPU catalog
    Gpus,
    /// List or search the model catalog
    Models {
        /// Filter by name or category
        #[arg(long)]
        search: Option<String>,
    },
    /// Inspect a local model directory (config.json, README, weight files)
    Inspect {
        dir: PathBuf,
    },
    /// Write a settings file with default values
    InitConfig {
        #[arg(long, default_value = "vram-advisor.json")]
        output: PathBuf,
    },
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let opts = commands::GlobalOpts {
        config: cli.config,
        gpu_catalog: cli.gpu_catalog,
        model_catalog: cli.model_catalog,
        json: cli.json,
    };

    match cli.command {
        Commands::Estimate { model, workload } => commands::estimate(&opts, &model, &workload),
        Commands::Recommend { model, workload } => commands::recommend(&opts, &model, &workload),
        Commands::UseCase {
            use_case,
            model,
            workload,
        } => commands::use_case(&opts, use_case, &model, &workload),
        Commands::MultiGpu {
            gpu,
            model,
            workload,
        } => commands::multi_gpu(&opts, &gpu, &model, &workload),
        Commands::Gpus => commands::list_gpus(&opts),
        Commands::Models { search } => commands::list_models(&opts, search.as_deref()),
        Commands::Inspect { dir } => commands::inspect(&opts, &dir),
        Commands::InitConfig { output } => commands::init_config(&output),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_batch_and_seq_len_rejected() {
        let parsed = Cli::try_parse_from(["vram-advisor", "estimate", "--params", "7B", "--batch-size", "0"]);
        assert!(parsed.is_err());

        let parsed = Cli::try_parse_from(["vram-advisor", "recommend", "--params", "7B", "--seq-len", "0"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_workload_flags_parse() {
        let cli = Cli::try_parse_from([
            "vram-advisor",
            "estimate",
            "--params",
            "7B",
            "--batch-size",
            "4",
            "--seq-len",
            "512",
            "--precision",
            "int8",
        ])
        .unwrap();

        let Commands::Estimate { workload, .. } = cli.command else {
            panic!("expected estimate");
        };
        assert_eq!(workload.batch_size.map(NonZeroUsize::get), Some(4));
        assert_eq!(workload.seq_len.map(NonZeroUsize::get), Some(512));
        assert_eq!(workload.precision, Some(Precision::Int8));
    }
}
