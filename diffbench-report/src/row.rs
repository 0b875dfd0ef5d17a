//! Result Rows
//!
//! One row per repetition. Column order: run indices and generation config,
//! program identity, program-family extras, then timings.

use diffbench_gen::GenerationConfig;
use diffbench_runner::{
    MICROS_EDIT_SCRIPT, MICROS_INPUT, MICROS_PRECOMPUTE, MICROS_UNTIL_LEN, MIN_EDIT_LEN,
    ParsedOutput,
};
use serde::{Deserialize, Serialize};

/// One measured (or timed-out) repetition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkRow {
    pub generation_config_i: usize,
    pub config: GenerationConfig,
    pub regen_i: usize,
    pub repetition_i: usize,
    pub diff_program: String,
    pub mpi_procs: Option<usize>,
    pub min_edit_len: Option<u64>,
    pub micros_input: Option<u64>,
    pub micros_precompute: Option<u64>,
    pub micros_until_len: Option<u64>,
    pub micros_edit_script: Option<u64>,
    pub wall_micros: u64,
    pub timed_out: bool,
}

/// Column layout shared by every row of one run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RowLayout {
    /// Emit the `mpi_procs` column. Set when any selected program is
    /// distributed; other programs leave it empty.
    pub mpi_procs: bool,
}

impl BenchmarkRow {
    /// Fill the timing columns from parsed program output.
    pub fn with_fields(mut self, fields: &ParsedOutput) -> Self {
        self.min_edit_len = fields.get(MIN_EDIT_LEN);
        self.micros_input = fields.get(MICROS_INPUT);
        self.micros_precompute = fields.get(MICROS_PRECOMPUTE);
        self.micros_until_len = fields.get(MICROS_UNTIL_LEN);
        self.micros_edit_script = fields.get(MICROS_EDIT_SCRIPT);
        self
    }

    /// Column names for `layout`, in output order
    pub fn columns(layout: RowLayout) -> Vec<&'static str> {
        let mut columns = vec![
            "generation_config_i",
            "input_strategy",
            "input_length_1",
            "input_change_strength",
            "input_chunkiness",
            "input_distribution",
            "regen_i",
            "repetition_i",
            "diff_program",
        ];
        if layout.mpi_procs {
            columns.push("mpi_procs");
        }
        columns.extend([
            "min_edit_len",
            "micros_input",
            "micros_precompute",
            "micros_until_len",
            "micros_edit_script",
            "wall_micros",
            "timed_out",
        ]);
        columns
    }

    /// Cell values matching [`BenchmarkRow::columns`]; absent values are empty.
    pub fn values(&self, layout: RowLayout) -> Vec<String> {
        fn opt<T: ToString>(value: Option<T>) -> String {
            value.map(|v| v.to_string()).unwrap_or_default()
        }

        let mut values = vec![
            self.generation_config_i.to_string(),
            self.config.strategy.to_string(),
            self.config.length_1.to_string(),
            self.config.change_strength.to_string(),
            self.config.chunkiness.to_string(),
            self.config.distribution.to_string(),
            self.regen_i.to_string(),
            self.repetition_i.to_string(),
            self.diff_program.clone(),
        ];
        if layout.mpi_procs {
            values.push(opt(self.mpi_procs));
        }
        values.extend([
            opt(self.min_edit_len),
            opt(self.micros_input),
            opt(self.micros_precompute),
            opt(self.micros_until_len),
            opt(self.micros_edit_script),
            self.wall_micros.to_string(),
            self.timed_out.to_string(),
        ]);
        values
    }
}
