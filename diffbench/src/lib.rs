#![warn(missing_docs)]
//! # diffbench
//!
//! Benchmarking harness for diff and edit-distance programs.
//!
//! - **Edit-pair generation**: sequence pairs whose difference is controlled
//!   by strategy, change strength and chunkiness, replayable from a seed
//! - **Process control**: each run in its own process group with timeout and
//!   SIGTERM/SIGKILL teardown
//! - **Adaptive repetition**: repeat until a distribution-free confidence
//!   band on the median is narrow enough
//! - **Results**: per-repetition CSV rows, a failure log and a JSON run report
//!
//! ## Quick Start
//!
//! ```
//! use diffbench::{Distribution, GenerationConfig, Strategy, generate_seeded};
//!
//! let config = GenerationConfig {
//!     strategy: Strategy::AddRemove,
//!     length_1: 50,
//!     change_strength: 0.2,
//!     chunkiness: 0.5,
//!     distribution: Distribution::Zipf,
//! };
//! let pair = generate_seeded(&config, 7).unwrap();
//! assert_eq!(pair, generate_seeded(&config, 7).unwrap());
//! ```

// Re-export generator
pub use diffbench_gen::{
    Distribution, EditOp, EditPair, GenError, GenerationConfig, Sequence, Strategy,
    TestCasePaths, WeightedSampler, apply_edit_script, build_chunky_mask, derive_seed, generate,
    generate_seeded, merge, partition, read_edit_script, read_test_case, write_test_case,
};

// Re-export stats
pub use diffbench_stats::{
    MedianBand, SortedSamples, SummaryStatistics, binomial_interval, compute_summary,
    median_band,
};

// Re-export runner
pub use diffbench_runner::{
    AdaptiveController, CancellationToken, CommandLine, DiffProgram, DiffRun, Measurement,
    OutputProtocol, ParsedOutput, ProcessOutput, ProcessRunner, ProgramFamily, Repetition,
    RepetitionConfig, RunnerError, StopReason,
};

// Re-export report
pub use diffbench_report::{
    BenchmarkRow, CsvRowWriter, FailureLog, Report, ReportError, RowLayout, read_json_report,
};

// Re-export CLI entry points
pub use diffbench_cli::{Cli, DiffBenchConfig, run, run_with_cli};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        AdaptiveController, DiffProgram, Distribution, GenerationConfig, ProcessRunner,
        RepetitionConfig, StopReason, Strategy, generate_seeded,
    };
}
