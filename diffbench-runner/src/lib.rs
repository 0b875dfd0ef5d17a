#![warn(missing_docs)]
//! diffbench Runner
//!
//! Executes external diff programs and decides how often to repeat them:
//! - `ProcessRunner`: process-group spawn, timeout, SIGTERM/SIGKILL teardown
//! - `OutputProtocol`: versioned parser for the programs' text output
//! - `AdaptiveController`: repeats until the median is known precisely enough
//! - `DiffProgram`: typed program descriptors per family

mod adaptive;
mod error;
mod output;
mod process;
mod program;

pub use adaptive::{
    AdaptiveController, Measurement, RepetitionConfig, Repetition, StopReason, TIMEOUT_STREAK,
};
pub use error::RunnerError;
pub use output::{
    Extractor, FieldSpec, MICROS_EDIT_SCRIPT, MICROS_INPUT, MICROS_PRECOMPUTE, MICROS_UNTIL_LEN,
    MIN_EDIT_LEN, OutputProtocol, ParsedOutput, count_diff_edits, first_capture_u64,
};
pub use process::{
    CancellationToken, CommandLine, DEFAULT_GRACE_PERIOD, ProcessOutput, ProcessRunner,
};
pub use program::{
    DiffProgram, DiffRun, MPI_LAUNCHER, ProgramFamily, WALL_MICROS, select_programs,
};
