#![warn(missing_docs)]
//! diffbench CLI Library
//!
//! Command-line front end tying generation, execution and reporting together.
//!
//! - `init`: print a commented `diffbench.toml`
//! - `prepare`: write the manifest and every test case of the grid
//! - `run`: measure all configured programs over the grid
//! - `generate`: write a single pair from explicit parameters
//! - `validate`: compare programs against `diff --minimal` on random cases

mod config;
mod driver;
mod manifest;
mod metadata;
mod planner;
mod validate;

pub use config::*;
pub use driver::{BenchmarkDriver, DriverSettings, FAILURES_FILE, REPORT_FILE, RESULTS_FILE};
pub use manifest::{
    CASE_STAMP_FILE, CaseStamp, MANIFEST_FILE, MANIFEST_SCHEMA_VERSION, Manifest, TEST_CASES_DIR,
    ensure_test_case, test_case_dir,
};
pub use metadata::{build_report_meta, git_commit, system_info};
pub use planner::{
    GenerationPlan, PlannedConfig, build_grid, build_plan, change_strengths, chunkiness_levels,
    file_sizes,
};
pub use validate::{
    ProgramCheck, ValidationOptions, ValidationSummary, Validator, random_generation_config,
};

use clap::{Parser, Subcommand};
use diffbench_gen::{Distribution, GenerationConfig, Strategy, generate_seeded, write_test_case};
use diffbench_runner::{
    AdaptiveController, CancellationToken, DiffProgram, OutputProtocol, ProcessRunner,
    select_programs,
};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// diffbench CLI arguments
#[derive(Parser, Debug)]
#[command(name = "diffbench")]
#[command(author, version, about = "diffbench - edit-pair generation and adaptive diff benchmarking")]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (default: diffbench.toml found by walking up)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Output directory (overrides [output].directory)
    #[arg(short, long, global = true)]
    pub output: Option<PathBuf>,

    /// Base seed (overrides [generation].seed)
    #[arg(long, global = true)]
    pub seed: Option<u64>,

    /// Comma separated subset of configured programs
    #[arg(long, global = true, value_delimiter = ',')]
    pub limit_programs: Option<Vec<String>>,

    /// Per-invocation timeout (e.g., "30s"; overrides [runner].timeout)
    #[arg(long, global = true)]
    pub timeout: Option<String>,

    /// Fewest repetitions per cell
    #[arg(long, global = true)]
    pub min_repetitions: Option<usize>,

    /// Most repetitions per cell
    #[arg(long, global = true)]
    pub max_repetitions: Option<usize>,

    /// Hide the progress bar
    #[arg(long, global = true)]
    pub no_progress: bool,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print a default diffbench.toml
    Init,
    /// Write the manifest and all test cases without running anything
    Prepare,
    /// Benchmark the configured programs
    Run {
        /// Reuse the grid and seed of a prepared manifest
        #[arg(long)]
        manifest: Option<PathBuf>,
    },
    /// Generate one edit pair
    Generate {
        /// Edit strategy: independent, add, remove, addremove
        #[arg(long, default_value = "addremove")]
        strategy: Strategy,
        /// Length of the first sequence
        #[arg(long)]
        length: usize,
        /// Fraction of elements changed, in (0, 1]
        #[arg(long, default_value = "0.2")]
        change_strength: f64,
        /// Clustering of changes, in [0, 1]
        #[arg(long, default_value = "0.5")]
        chunkiness: f64,
        /// Symbol distribution: uniform, zipf
        #[arg(long, default_value = "zipf")]
        distribution: Distribution,
        /// Target directory (default: <output>/<test case name>)
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Compare programs against the golden diff on random cases
    Validate {
        /// Number of randomized cases
        #[arg(long, default_value = "10")]
        num_tests: usize,
        /// Stop as soon as one case fails
        #[arg(long)]
        early_stop: bool,
    },
}

/// Run the diffbench CLI with arguments from the environment.
pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    run_with_cli(cli)
}

/// Run the diffbench CLI with pre-parsed arguments.
pub fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    // Initialize logging
    if cli.verbose {
        tracing_subscriber::fmt()
            .with_env_filter("diffbench=debug")
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter("diffbench=info")
            .init();
    }

    if let Commands::Init = cli.command {
        print!("{}", DiffBenchConfig::default_toml());
        return Ok(());
    }

    let config = resolve_config(&cli)?;
    let output_dir = cli
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.output.directory));

    match &cli.command {
        Commands::Init => Ok(()),
        Commands::Prepare => prepare(&cli, &config, &output_dir),
        Commands::Run { manifest } => run_benchmarks(&cli, &config, &output_dir, manifest.as_deref()),
        Commands::Generate {
            strategy,
            length,
            change_strength,
            chunkiness,
            distribution,
            dir,
        } => {
            let generation = if *strategy == Strategy::Independent {
                GenerationConfig::independent(*length, *distribution)
            } else {
                GenerationConfig {
                    strategy: *strategy,
                    length_1: *length,
                    change_strength: *change_strength,
                    chunkiness: *chunkiness,
                    distribution: *distribution,
                }
            };
            generation.validate()?;
            let seed = resolve_seed(&cli, &config);
            let dir = dir
                .clone()
                .unwrap_or_else(|| output_dir.join(generation.test_case_name()));
            let pair = generate_seeded(&generation, seed)?;
            let paths = write_test_case(&dir, &pair)?;
            println!(
                "{} ({} -> {} elements, seed {})",
                paths.dir.display(),
                pair.a.len(),
                pair.b.len(),
                seed
            );
            Ok(())
        }
        Commands::Validate {
            num_tests,
            early_stop,
        } => validate_programs(&cli, &config, &output_dir, *num_tests, *early_stop),
    }
}

/// Load configuration and apply CLI overrides.
fn resolve_config(cli: &Cli) -> anyhow::Result<DiffBenchConfig> {
    let mut config = match &cli.config {
        Some(path) => DiffBenchConfig::load(path)?,
        None => DiffBenchConfig::discover()?.unwrap_or_default(),
    };

    if let Some(timeout) = &cli.timeout {
        config.runner.timeout = timeout.clone();
    }
    if let Some(min) = cli.min_repetitions {
        config.runner.min_repetitions = min;
    }
    if let Some(max) = cli.max_repetitions {
        config.runner.max_repetitions = max;
    }
    config.validate()?;
    Ok(config)
}

fn resolve_seed(cli: &Cli, config: &DiffBenchConfig) -> u64 {
    cli.seed
        .or(config.generation.seed)
        .unwrap_or_else(rand::random)
}

fn selected_programs(cli: &Cli, config: &DiffBenchConfig) -> anyhow::Result<Vec<DiffProgram>> {
    let programs = match &cli.limit_programs {
        Some(names) => select_programs(&config.programs, names)?,
        None => config.programs.clone(),
    };
    if programs.is_empty() {
        anyhow::bail!("no programs configured; add [[programs]] to diffbench.toml");
    }
    Ok(programs)
}

/// Process runner wired to Ctrl-C.
fn build_runner(config: &DiffBenchConfig) -> anyhow::Result<ProcessRunner> {
    let token = CancellationToken::new();
    let handler_token = token.clone();
    if let Err(e) = ctrlc::set_handler(move || handler_token.cancel()) {
        warn!("Could not install Ctrl-C handler: {}", e);
    }
    Ok(ProcessRunner::new(config.timeout()?)
        .with_grace_period(config.grace_period()?)
        .with_cancellation(token))
}

fn prepare(cli: &Cli, config: &DiffBenchConfig, output_dir: &Path) -> anyhow::Result<()> {
    let seed = resolve_seed(cli, config);
    let num_regens = config.generation.num_regens;
    let plan = build_plan(&config.generation, seed);
    let manifest = Manifest::from_plan(&plan, seed, num_regens);
    manifest.save(output_dir.join(MANIFEST_FILE))?;

    for planned in &plan.configs {
        for regen_i in 0..num_regens {
            ensure_test_case(output_dir, seed, planned, regen_i)?;
        }
    }
    info!(
        "Prepared {} configs x {} regens in {} (seed {})",
        plan.configs.len(),
        num_regens,
        output_dir.display(),
        seed
    );
    Ok(())
}

fn run_benchmarks(
    cli: &Cli,
    config: &DiffBenchConfig,
    output_dir: &Path,
    manifest_path: Option<&Path>,
) -> anyhow::Result<()> {
    let programs = selected_programs(cli, config)?;

    let manifest = match manifest_path {
        Some(path) => {
            let manifest = Manifest::load(path)?;
            if cli.seed.is_some_and(|seed| seed != manifest.base_seed) {
                warn!(
                    "Ignoring --seed; the manifest fixes base seed {}",
                    manifest.base_seed
                );
            }
            manifest
        }
        None => {
            let seed = resolve_seed(cli, config);
            let plan = build_plan(&config.generation, seed);
            let manifest = Manifest::from_plan(&plan, seed, config.generation.num_regens);
            manifest.save(output_dir.join(MANIFEST_FILE))?;
            manifest
        }
    };
    let plan = manifest.plan()?;

    println!(
        "Running {} configs x {} regens x {} programs (seed {})...\n",
        plan.configs.len(),
        manifest.num_regens,
        programs.len(),
        manifest.base_seed
    );

    let meta = build_report_meta(config, &programs, manifest.base_seed)?;
    let driver = BenchmarkDriver::new(
        build_runner(config)?,
        AdaptiveController::new(config.repetition_config())?,
        OutputProtocol::v1()?,
        programs,
        DriverSettings {
            output_dir: output_dir.to_path_buf(),
            base_seed: manifest.base_seed,
            num_regens: manifest.num_regens,
            sample_field: config.runner.sample_field.clone(),
            flush_interval: config.flush_interval()?,
            show_progress: !cli.no_progress,
        },
    );
    let report = driver.run(&plan, meta)?;

    let summary = &report.summary;
    println!(
        "\n{} cells: {} converged, {} not converged, {} always timed out, {} failed ({} repetitions, {:.1}s)",
        summary.total_cells,
        summary.converged,
        summary.not_converged,
        summary.always_timed_out,
        summary.failed,
        summary.total_repetitions,
        summary.total_duration_ms / 1000.0
    );

    if report.meta.cancelled {
        anyhow::bail!(
            "run cancelled; partial results in {}",
            output_dir.display()
        );
    }
    Ok(())
}

fn validate_programs(
    cli: &Cli,
    config: &DiffBenchConfig,
    output_dir: &Path,
    num_tests: usize,
    early_stop: bool,
) -> anyhow::Result<()> {
    let programs = selected_programs(cli, config)?;
    let runner = build_runner(config)?;
    let protocol = OutputProtocol::v1()?;
    let validator = Validator::new(&runner, &protocol, DiffProgram::golden(), &programs);

    let seed = resolve_seed(cli, config);
    info!("Validating {} programs (seed {})", programs.len(), seed);
    let options = ValidationOptions {
        num_tests,
        early_stop,
        work_dir: output_dir.join("validate"),
    };
    let summary = validator.run(
        &mut StdRng::seed_from_u64(seed),
        &options,
        &mut std::io::stdout().lock(),
    )?;

    if !summary.all_passed() {
        anyhow::bail!(
            "{} of {} validation cases failed",
            summary.cases_failed,
            summary.cases_run
        );
    }
    println!("All {} validation cases passed.", summary.cases_run);
    Ok(())
}
