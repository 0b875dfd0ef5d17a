//! Configuration loading from diffbench.toml
//!
//! diffbench configuration lives in a `diffbench.toml` file, discovered by
//! walking up from the current directory. Every section is optional.

use diffbench_gen::{Distribution, Strategy};
use diffbench_runner::{DiffProgram, MICROS_UNTIL_LEN, ProgramFamily, RepetitionConfig};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// File name searched for by [`DiffBenchConfig::discover`]
pub const CONFIG_FILE: &str = "diffbench.toml";

/// Upper bound accepted for the timeout and the grace period
pub const MAX_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);

/// diffbench configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DiffBenchConfig {
    /// Generation grid
    #[serde(default)]
    pub generation: GenerationSection,
    /// Process and repetition settings
    #[serde(default)]
    pub runner: RunnerSection,
    /// Output locations
    #[serde(default)]
    pub output: OutputSection,
    /// Programs to benchmark
    #[serde(default)]
    pub programs: Vec<DiffProgram>,
}

/// Which edit pairs are generated
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationSection {
    /// Smallest length of sequence A
    #[serde(default = "default_min_file_size")]
    pub min_file_size: usize,
    /// Largest length of sequence A
    #[serde(default = "default_max_file_size")]
    pub max_file_size: usize,
    /// Number of geometrically spaced lengths
    #[serde(default = "default_file_size_steps")]
    pub file_size_steps: usize,
    /// Number of change strengths in (0, 1]
    #[serde(default = "default_change_strength_steps")]
    pub change_strength_steps: usize,
    /// Number of chunkiness levels in [0, 1]
    #[serde(default = "default_chunkiness_steps")]
    pub chunkiness_steps: usize,
    /// Strategies in the grid
    #[serde(default = "default_strategies")]
    pub strategies: Vec<Strategy>,
    /// Symbol distribution
    #[serde(default = "default_distribution")]
    pub distribution: Distribution,
    /// Pairs generated per config
    #[serde(default = "default_num_regens")]
    pub num_regens: usize,
    /// Base seed; a random one is drawn and recorded when absent
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for GenerationSection {
    fn default() -> Self {
        Self {
            min_file_size: default_min_file_size(),
            max_file_size: default_max_file_size(),
            file_size_steps: default_file_size_steps(),
            change_strength_steps: default_change_strength_steps(),
            chunkiness_steps: default_chunkiness_steps(),
            strategies: default_strategies(),
            distribution: default_distribution(),
            num_regens: default_num_regens(),
            seed: None,
        }
    }
}

fn default_min_file_size() -> usize {
    1
}
fn default_max_file_size() -> usize {
    5000
}
fn default_file_size_steps() -> usize {
    10
}
fn default_change_strength_steps() -> usize {
    5
}
fn default_chunkiness_steps() -> usize {
    3
}
fn default_strategies() -> Vec<Strategy> {
    Strategy::ALL.to_vec()
}
fn default_distribution() -> Distribution {
    Distribution::Zipf
}
fn default_num_regens() -> usize {
    3
}

/// How programs are run and repeated
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerSection {
    /// Timeout for one invocation (e.g., "60s", "5m")
    #[serde(default = "default_timeout")]
    pub timeout: String,
    /// Time between SIGTERM and SIGKILL on teardown
    #[serde(default = "default_grace_period")]
    pub grace_period: String,
    /// Fewest repetitions per cell
    #[serde(default = "default_min_repetitions")]
    pub min_repetitions: usize,
    /// Most repetitions per cell
    #[serde(default = "default_max_repetitions")]
    pub max_repetitions: usize,
    /// Confidence level of the median band
    #[serde(default = "default_confidence_level")]
    pub confidence_level: f64,
    /// Tolerated band width relative to the median
    #[serde(default = "default_max_median_error")]
    pub max_median_error: f64,
    /// Output field used as the timing sample, or `wall_micros`
    #[serde(default = "default_sample_field")]
    pub sample_field: String,
}

impl Default for RunnerSection {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            grace_period: default_grace_period(),
            min_repetitions: default_min_repetitions(),
            max_repetitions: default_max_repetitions(),
            confidence_level: default_confidence_level(),
            max_median_error: default_max_median_error(),
            sample_field: default_sample_field(),
        }
    }
}

fn default_timeout() -> String {
    "60s".to_string()
}
fn default_grace_period() -> String {
    "500ms".to_string()
}
fn default_min_repetitions() -> usize {
    5
}
fn default_max_repetitions() -> usize {
    50
}
fn default_confidence_level() -> f64 {
    0.95
}
fn default_max_median_error() -> f64 {
    0.05
}
fn default_sample_field() -> String {
    MICROS_UNTIL_LEN.to_string()
}

/// Where results go
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputSection {
    /// Output directory for test cases, rows and reports
    #[serde(default = "default_output_dir")]
    pub directory: String,
    /// Wall-clock interval between row flushes
    #[serde(default = "default_flush_interval")]
    pub flush_interval: String,
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            directory: default_output_dir(),
            flush_interval: default_flush_interval(),
        }
    }
}

fn default_output_dir() -> String {
    "target/diffbench".to_string()
}
fn default_flush_interval() -> String {
    "5s".to_string()
}

impl DiffBenchConfig {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("{}: {}", path.as_ref().display(), e))?;
        Ok(config)
    }

    /// Find `diffbench.toml` by walking up from the current directory.
    pub fn discover_path() -> Option<PathBuf> {
        let mut dir = std::env::current_dir().ok()?;
        loop {
            let config_path = dir.join(CONFIG_FILE);
            if config_path.exists() {
                return Some(config_path);
            }
            if !dir.pop() {
                break;
            }
        }
        None
    }

    /// Discover and load configuration. A file that exists but does not
    /// parse is an error, not a silent fallback.
    pub fn discover() -> anyhow::Result<Option<Self>> {
        Self::discover_path().map(Self::load).transpose()
    }

    /// Check values that serde cannot.
    pub fn validate(&self) -> anyhow::Result<()> {
        let g = &self.generation;
        if g.min_file_size == 0 || g.min_file_size > g.max_file_size {
            anyhow::bail!(
                "file sizes must satisfy 1 <= min_file_size <= max_file_size, got {}..{}",
                g.min_file_size,
                g.max_file_size
            );
        }
        if g.file_size_steps == 0 || g.change_strength_steps == 0 || g.chunkiness_steps == 0 {
            anyhow::bail!("grid step counts must be at least 1");
        }
        if g.strategies.is_empty() {
            anyhow::bail!("no generation strategies configured");
        }

        self.repetition_config().validate()?;
        for (name, value) in [("timeout", self.timeout()?), ("grace_period", self.grace_period()?)] {
            if value > MAX_TIMEOUT {
                anyhow::bail!(
                    "runner.{} of {:?} exceeds the maximum of {:?}",
                    name,
                    value,
                    MAX_TIMEOUT
                );
            }
        }
        self.flush_interval()?;

        let mut names = BTreeSet::new();
        for program in &self.programs {
            if !names.insert(program.name.as_str()) {
                anyhow::bail!("duplicate program name {}", program.name);
            }
            if let ProgramFamily::Distributed { processes: 0 } = program.family {
                anyhow::bail!("program {} needs at least one process", program.name);
            }
        }
        Ok(())
    }

    /// Repetition limits for the adaptive controller
    pub fn repetition_config(&self) -> RepetitionConfig {
        RepetitionConfig {
            min_repetitions: self.runner.min_repetitions,
            max_repetitions: self.runner.max_repetitions,
            confidence_level: self.runner.confidence_level,
            max_median_error: self.runner.max_median_error,
        }
    }

    /// Per-invocation timeout
    pub fn timeout(&self) -> anyhow::Result<Duration> {
        Self::parse_duration(&self.runner.timeout)
    }

    /// Grace period between SIGTERM and SIGKILL
    pub fn grace_period(&self) -> anyhow::Result<Duration> {
        Self::parse_duration(&self.runner.grace_period)
    }

    /// Row flush interval
    pub fn flush_interval(&self) -> anyhow::Result<Duration> {
        Self::parse_duration(&self.output.flush_interval)
    }

    /// Generate a default configuration as TOML string
    pub fn default_toml() -> String {
        r#"# diffbench Configuration

[generation]
# Range of lengths of the first sequence (geometrically spaced)
min_file_size = 1
max_file_size = 5000
file_size_steps = 10
# Change strengths are spaced evenly in (0, 1]
change_strength_steps = 5
# Chunkiness levels are spaced evenly in [0, 1]
chunkiness_steps = 3
strategies = ["independent", "add", "remove", "addremove"]
# Symbol distribution: "uniform" or "zipf"
distribution = "zipf"
# Pairs generated per configuration
num_regens = 3
# Base seed (uncomment to pin; otherwise drawn and recorded in the manifest)
# seed = 42

[runner]
# Timeout for a single program invocation
timeout = "60s"
# Time between SIGTERM and SIGKILL when tearing down a program
grace_period = "500ms"
# Repetition limits per (config, program) cell
min_repetitions = 5
max_repetitions = 50
# Stop once the median confidence band is within max_median_error of the median
confidence_level = 0.95
max_median_error = 0.05
# Output field used as the timing sample ("wall_micros" for wall clock)
sample_field = "micros_until_len"

[output]
# Test cases, results.csv, failures.jsonl and report.json go here
directory = "target/diffbench"
# Interval between flushes of result rows
flush_interval = "5s"

# Programs to benchmark (uncomment and adapt)
# [[programs]]
# name = "sequential"
# executable = "./own-diff-sequential.out"
# family = "sequential"
#
# [[programs]]
# name = "mpi"
# executable = "./own-diff-mpi.out"
# family = "distributed"
# processes = 4
# edit_script = true
#
# [[programs]]
# name = "diffutils"
# executable = "diff"
# family = "golden"
"#
        .to_string()
    }

    /// Parse duration string (e.g., "3s", "500ms", "2m")
    pub fn parse_duration(s: &str) -> anyhow::Result<Duration> {
        let s = s.trim();
        if s.is_empty() {
            return Err(anyhow::anyhow!("Empty duration string"));
        }

        // Find where the number ends and unit begins
        let (num_part, unit_part) = s
            .char_indices()
            .find(|(_, c)| c.is_alphabetic())
            .map(|(i, _)| s.split_at(i))
            .unwrap_or((s, "s"));

        let value: f64 = num_part
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("Invalid duration number: {}", num_part))?;
        if !value.is_finite() || value < 0.0 {
            return Err(anyhow::anyhow!("Invalid duration number: {}", num_part));
        }

        let multiplier: f64 = match unit_part.to_lowercase().as_str() {
            "ns" => 1e-9,
            "us" | "μs" => 1e-6,
            "ms" => 1e-3,
            "s" | "" => 1.0,
            "m" | "min" => 60.0,
            _ => return Err(anyhow::anyhow!("Unknown duration unit: {}", unit_part)),
        };

        Duration::try_from_secs_f64(value * multiplier)
            .map_err(|_| anyhow::anyhow!("Duration out of range: {}", s))
    }
}
