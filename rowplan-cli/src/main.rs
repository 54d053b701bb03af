//! Command-line frontend for the rowplan workflow orchestrator.
//!
//! Thin wrapper: argument parsing, logging setup, exit-code mapping
//! and a console summary. Exit code 1 means the corridor failed to
//! load or the orchestration itself broke; partial analytical failure
//! is visible through the bundle summary and missing artifacts, not
//! through the exit code.

use anyhow::{bail, Context};
use clap::Parser;
use rowplan::prelude::*;
use rowplan::sample;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG_PATH: &str = "configs/default_config.json";

#[derive(Parser, Debug)]
#[command(
    name = "rowplan",
    version,
    about = "Run a right-of-way maintenance-planning workflow"
)]
struct Args {
    /// Path to the ROW corridor GeoJSON file.
    #[arg(long, conflicts_with = "demo")]
    corridor: Option<PathBuf>,

    /// Run against generated demo corridor data.
    #[arg(long)]
    demo: bool,

    /// Configuration file path.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output directory for result artifacts.
    #[arg(long, default_value = "output")]
    output: PathBuf,

    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn run(args: &Args) -> anyhow::Result<()> {
    std::fs::create_dir_all(&args.output)
        .with_context(|| format!("could not create output directory {}", args.output.display()))?;

    let corridor_path = resolve_corridor_path(args)?;
    let corridor = CorridorLoader::load(&corridor_path)
        .with_context(|| format!("failed to load corridor data from {}", corridor_path.display()))?;
    let config = load_config(args.config.as_deref())?;

    let orchestrator = WorkflowOrchestrator::new(sample::demo_runner()).with_config(config);
    let bundle = orchestrator.run_full(&corridor);

    let report = ResultExporter::new(&args.output).export(&bundle);
    print_summary(&bundle, &report, &args.output);
    Ok(())
}

fn resolve_corridor_path(args: &Args) -> anyhow::Result<PathBuf> {
    if args.demo {
        let path = args.output.join("demo_corridor.geojson");
        sample::write_sample_corridor(&path)?;
        return Ok(path);
    }
    match &args.corridor {
        Some(path) => Ok(path.clone()),
        None => bail!("corridor path required when not using demo mode"),
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<WorkflowConfig> {
    match path {
        Some(path) => WorkflowConfig::load(path)
            .with_context(|| format!("failed to load configuration from {}", path.display())),
        None => {
            let default = Path::new(DEFAULT_CONFIG_PATH);
            if default.exists() {
                WorkflowConfig::load(default)
                    .with_context(|| format!("failed to load configuration from {DEFAULT_CONFIG_PATH}"))
            } else {
                warn!(path = DEFAULT_CONFIG_PATH, "no configuration found, using defaults");
                Ok(WorkflowConfig::default())
            }
        }
    }
}

fn stage_label(stage: StageName) -> &'static str {
    match stage {
        StageName::Data => "Data Acquisition",
        StageName::Vegetation => "Vegetation Analysis",
        StageName::Risk => "Risk Assessment",
        StageName::Priorities => "Prioritization",
        StageName::Reports => "Reporting",
    }
}

fn print_summary(bundle: &ResultBundle, report: &ExportReport, output_dir: &Path) {
    println!("\n{}", "=".repeat(60));
    println!("ROW MAINTENANCE-PLANNING WORKFLOW SUMMARY");
    println!("{}", "=".repeat(60));

    for (stage, result) in bundle.iter() {
        let line = match result {
            StageResult::Success { .. } => format!("[ok]   {}: Completed", stage_label(stage)),
            StageResult::Skipped { reason } => {
                format!("[skip] {}: {reason}", stage_label(stage))
            }
            StageResult::Failed { error } => {
                format!("[fail] {}: {error}", stage_label(stage))
            }
        };
        println!("{line}");
    }

    println!("\nResults Location: {}", output_dir.display());
    if !report.written.is_empty() {
        println!("\nGenerated Files:");
        for path in &report.written {
            if let Some(name) = path.file_name() {
                println!("  - {}", name.to_string_lossy());
            }
        }
    }
    if !report.failures.is_empty() {
        println!("\nExport Failures:");
        for failure in &report.failures {
            println!("  - {failure}");
        }
    }
    println!("{}", "=".repeat(60));
}
