//! Diff Program Descriptors
//!
//! Each benchmarked program belongs to one family that decides how it is
//! launched, which exit codes mean success and how its output is read.

use crate::error::RunnerError;
use crate::output::{
    MICROS_UNTIL_LEN, MIN_EDIT_LEN, OutputProtocol, ParsedOutput, count_diff_edits,
};
use crate::process::{CommandLine, ProcessRunner};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Launcher used for distributed programs
pub const MPI_LAUNCHER: &str = "mpiexec";

/// Wall-clock field recorded for every run
pub const WALL_MICROS: &str = "wall_micros";

/// How a program is launched and read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "lowercase")]
pub enum ProgramFamily {
    /// Single process, versioned text output
    Sequential,
    /// Started through the MPI launcher with a fixed process count
    Distributed { processes: usize },
    /// Trusted reference `diff`; edit count read from its normal output
    Golden,
}

impl ProgramFamily {
    /// Exit codes that count as success
    pub fn allowed_exit_codes(&self) -> &'static [i32] {
        match self {
            // diff: 0 identical, 1 different
            ProgramFamily::Golden => &[0, 1],
            _ => &[0],
        }
    }

    /// Worker-process count, for the families that have one
    pub fn mpi_procs(&self) -> Option<usize> {
        match self {
            ProgramFamily::Distributed { processes } => Some(*processes),
            _ => None,
        }
    }
}

/// A benchmarked diff program
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffProgram {
    pub name: String,
    pub executable: PathBuf,
    #[serde(flatten)]
    pub family: ProgramFamily,
    /// Whether the program accepts a third path to write its edit script to
    #[serde(default)]
    pub edit_script: bool,
}

/// Everything read from one successful run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffRun {
    pub fields: ParsedOutput,
    pub wall_micros: u64,
}

impl DiffRun {
    /// Value of `field`, with `wall_micros` always available.
    pub fn sample(&self, field: &str) -> Result<u64, RunnerError> {
        if field == WALL_MICROS {
            return Ok(self.wall_micros);
        }
        self.fields.require(field)
    }

    /// Edit length reported by the program
    pub fn min_edit_len(&self) -> Result<u64, RunnerError> {
        self.fields.require(MIN_EDIT_LEN)
    }
}

impl DiffProgram {
    /// The reference `diff` found on `PATH`
    pub fn golden() -> Self {
        Self {
            name: "diffutils".to_string(),
            executable: PathBuf::from("diff"),
            family: ProgramFamily::Golden,
            edit_script: false,
        }
    }

    /// Command comparing `first` against `second`.
    pub fn command(&self, first: &Path, second: &Path, edit_script: Option<&Path>) -> CommandLine {
        let mut command = match self.family {
            ProgramFamily::Sequential => CommandLine::new(&self.executable),
            ProgramFamily::Distributed { processes } => CommandLine::new(MPI_LAUNCHER)
                .arg("-np")
                .arg(processes.to_string())
                .arg(&self.executable),
            ProgramFamily::Golden => CommandLine::new(&self.executable).arg("--minimal"),
        };
        command = command.arg(first).arg(second);
        if let (true, Some(path)) = (self.edit_script, edit_script) {
            if self.family != ProgramFamily::Golden {
                command = command.arg(path);
            }
        }
        command
    }

    /// Field the adaptive controller samples for this program.
    ///
    /// Golden runs print no timings, so they are always timed by wall clock.
    pub fn sample_field<'a>(&self, configured: &'a str) -> &'a str {
        match self.family {
            ProgramFamily::Golden => WALL_MICROS,
            _ => configured,
        }
    }

    /// Run once and read its results.
    pub fn run(
        &self,
        runner: &ProcessRunner,
        protocol: &OutputProtocol,
        first: &Path,
        second: &Path,
        edit_script: Option<&Path>,
    ) -> Result<DiffRun, RunnerError> {
        let command = self.command(first, second, edit_script);
        let output = runner.run(&command, self.family.allowed_exit_codes())?;

        let fields = match self.family {
            ProgramFamily::Golden => {
                let mut fields = ParsedOutput::default();
                fields.insert(MIN_EDIT_LEN, count_diff_edits(&output.stdout));
                fields.insert(MICROS_UNTIL_LEN, output.wall_micros());
                fields
            }
            _ => protocol.parse(&output.stdout)?,
        };

        Ok(DiffRun {
            fields,
            wall_micros: output.wall_micros(),
        })
    }
}

/// Keep only programs named in `selected`. Unknown names are an error
/// listing all of them, sorted.
pub fn select_programs(
    programs: &[DiffProgram],
    selected: &[String],
) -> Result<Vec<DiffProgram>, RunnerError> {
    let mut unknown: Vec<&str> = selected
        .iter()
        .map(|s| s.trim())
        .filter(|name| !programs.iter().any(|p| p.name == *name))
        .collect();
    if !unknown.is_empty() {
        unknown.sort_unstable();
        unknown.dedup();
        return Err(RunnerError::InvalidConfiguration(format!(
            "unknown program names: {}",
            unknown.join(", ")
        )));
    }

    Ok(programs
        .iter()
        .filter(|p| selected.iter().any(|s| s.trim() == p.name))
        .cloned()
        .collect())
}
