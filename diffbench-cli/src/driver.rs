//! Benchmark Driver
//!
//! Walks the plan cell by cell: for every config, regen and program it makes
//! sure the test case exists, lets the adaptive controller repeat the program
//! until the median is settled, and streams the outcome to disk.
//!
//! ## Outputs (inside the output directory)
//!
//! - `results.csv`: one row per repetition, written as soon as the
//!   repetition is recorded and flushed periodically
//! - `failures.jsonl`: one record per cell that failed
//! - `report.json`: per-cell convergence and run totals, also written when
//!   the run is cancelled (marked partial)

use crate::manifest::ensure_test_case;
use crate::planner::{GenerationPlan, PlannedConfig};
use chrono::Utc;
use diffbench_gen::TestCasePaths;
use diffbench_report::{
    BenchmarkRow, CellResult, CsvRowWriter, FailureLog, FailureRecord, Report, ReportMeta,
    ReportSummary, RowLayout, write_json_report,
};
use diffbench_runner::{
    AdaptiveController, DiffProgram, DiffRun, Measurement, OutputProtocol, ProcessRunner,
    Repetition, StopReason,
};
use diffbench_stats::compute_summary;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Result rows file name
pub const RESULTS_FILE: &str = "results.csv";
/// Failure log file name
pub const FAILURES_FILE: &str = "failures.jsonl";
/// Run report file name
pub const REPORT_FILE: &str = "report.json";

/// Run-wide settings of the driver
#[derive(Debug, Clone)]
pub struct DriverSettings {
    /// Directory for test cases and outputs
    pub output_dir: PathBuf,
    /// Seed every test case is derived from
    pub base_seed: u64,
    /// Pairs per generation config
    pub num_regens: usize,
    /// Output field sampled by the controller
    pub sample_field: String,
    /// Interval between row flushes
    pub flush_interval: Duration,
    /// Draw the progress bar
    pub show_progress: bool,
}

/// Runs a plan against a set of programs
pub struct BenchmarkDriver {
    runner: ProcessRunner,
    controller: AdaptiveController,
    protocol: OutputProtocol,
    programs: Vec<DiffProgram>,
    settings: DriverSettings,
}

impl BenchmarkDriver {
    /// Create a new driver
    pub fn new(
        runner: ProcessRunner,
        controller: AdaptiveController,
        protocol: OutputProtocol,
        programs: Vec<DiffProgram>,
        settings: DriverSettings,
    ) -> Self {
        Self {
            runner,
            controller,
            protocol,
            programs,
            settings,
        }
    }

    /// Measure every cell of `plan` and write rows, failures and the report.
    ///
    /// A cancelled run still returns its partial report, with
    /// `meta.cancelled` set; the interrupted cell keeps the repetitions it
    /// took. The caller decides the exit status.
    pub fn run(&self, plan: &GenerationPlan, mut meta: ReportMeta) -> anyhow::Result<Report> {
        let start = Instant::now();
        let output_dir = &self.settings.output_dir;
        std::fs::create_dir_all(output_dir)?;

        let layout = RowLayout {
            mpi_procs: self
                .programs
                .iter()
                .any(|p| p.family.mpi_procs().is_some()),
        };
        let mut rows =
            CsvRowWriter::create(output_dir.join(RESULTS_FILE), self.settings.flush_interval)?;
        let mut failures = FailureLog::create(output_dir.join(FAILURES_FILE))?;

        let total = plan.configs.len() * self.settings.num_regens * self.programs.len();
        let pb = self.progress_bar(total);
        let mut cells = Vec::with_capacity(total);
        let mut cancelled = false;

        'plan: for planned in &plan.configs {
            for regen_i in 0..self.settings.num_regens {
                if self.runner.cancellation().is_cancelled() {
                    cancelled = true;
                    break 'plan;
                }
                let paths = ensure_test_case(output_dir, self.settings.base_seed, planned, regen_i)?;

                for program in &self.programs {
                    pb.set_message(format!(
                        "{} {}",
                        program.name,
                        planned.config.test_case_name()
                    ));

                    let measurement = self.measure_cell(program, &paths, |repetition_i, repetition| {
                        let row = benchmark_row(planned, regen_i, repetition_i, program, repetition);
                        rows.write_row(&row, layout)?;
                        Ok(())
                    })?;

                    match &measurement.stop {
                        StopReason::Failed { error } => {
                            warn!(
                                "{} failed on {} (regen {}): {}",
                                program.name,
                                planned.config.test_case_name(),
                                regen_i,
                                error
                            );
                            failures.record(&FailureRecord {
                                timestamp: Utc::now(),
                                diff_program: program.name.clone(),
                                generation_config_i: planned.index,
                                regen_i,
                                config: planned.config,
                                error: error.clone(),
                            })?;
                        }
                        StopReason::AlwaysTimesOut => {
                            warn!(
                                "{} always times out on {} (regen {})",
                                program.name,
                                planned.config.test_case_name(),
                                regen_i
                            );
                        }
                        StopReason::BudgetExhausted { .. } => {
                            warn!(
                                "{} did not converge on {} (regen {})",
                                program.name,
                                planned.config.test_case_name(),
                                regen_i
                            );
                        }
                        StopReason::Cancelled => {
                            cancelled = true;
                            if !measurement.repetitions.is_empty() {
                                cells.push(cell_result(planned, regen_i, program, &measurement));
                            }
                            break 'plan;
                        }
                        StopReason::Converged => {}
                    }

                    cells.push(cell_result(planned, regen_i, program, &measurement));
                    pb.inc(1);
                }
            }
        }

        rows.flush()?;
        if cancelled {
            pb.abandon_with_message("cancelled");
            warn!(
                "Run cancelled after {} of {} cells; writing partial report",
                cells.len(),
                total
            );
        } else {
            pb.finish_with_message("done");
        }

        meta.cancelled = cancelled;
        let summary = ReportSummary::from_cells(&cells, start.elapsed().as_secs_f64() * 1000.0);
        let report = Report {
            meta,
            cells,
            summary,
        };
        write_json_report(output_dir.join(REPORT_FILE), &report)?;

        info!(
            "{} rows, {} failed cells, report at {}",
            rows.rows_written(),
            failures.count(),
            output_dir.join(REPORT_FILE).display()
        );
        Ok(report)
    }

    /// Repeat `program` on `paths`, passing each repetition to `on_repetition`.
    fn measure_cell<G>(
        &self,
        program: &DiffProgram,
        paths: &TestCasePaths,
        on_repetition: G,
    ) -> anyhow::Result<Measurement<DiffRun>>
    where
        G: FnMut(usize, &Repetition<DiffRun>) -> anyhow::Result<()>,
    {
        let sample_field = program.sample_field(&self.settings.sample_field);
        let edit_script = program
            .edit_script
            .then(|| paths.dir.join(format!("{}.script", program.name)));

        self.controller.measure_with(
            |_| {
                let run = program.run(
                    &self.runner,
                    &self.protocol,
                    &paths.first,
                    &paths.second,
                    edit_script.as_deref(),
                )?;
                let micros = run.sample(sample_field)? as f64;
                Ok((run, micros))
            },
            on_repetition,
        )
    }

    fn progress_bar(&self, total: usize) -> ProgressBar {
        if !self.settings.show_progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(total as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        pb
    }
}

fn benchmark_row(
    planned: &PlannedConfig,
    regen_i: usize,
    repetition_i: usize,
    program: &DiffProgram,
    repetition: &Repetition<DiffRun>,
) -> BenchmarkRow {
    let row = BenchmarkRow {
        generation_config_i: planned.index,
        config: planned.config,
        regen_i,
        repetition_i,
        diff_program: program.name.clone(),
        mpi_procs: program.family.mpi_procs(),
        min_edit_len: None,
        micros_input: None,
        micros_precompute: None,
        micros_until_len: None,
        micros_edit_script: None,
        wall_micros: repetition.micros() as u64,
        timed_out: repetition.timed_out(),
    };
    match repetition {
        Repetition::Completed { value, .. } => BenchmarkRow {
            wall_micros: value.wall_micros,
            ..row
        }
        .with_fields(&value.fields),
        Repetition::TimedOut { .. } => row,
    }
}

fn cell_result(
    planned: &PlannedConfig,
    regen_i: usize,
    program: &DiffProgram,
    measurement: &Measurement<DiffRun>,
) -> CellResult {
    CellResult {
        generation_config_i: planned.index,
        regen_i,
        diff_program: program.name.clone(),
        config: planned.config,
        repetitions: measurement.repetitions.len(),
        timed_out: measurement
            .repetitions
            .iter()
            .filter(|r| r.timed_out())
            .count(),
        median_micros: measurement.median(),
        band: measurement.band,
        stop: measurement.stop.clone(),
        summary: (!measurement.samples.is_empty())
            .then(|| compute_summary(measurement.samples.as_slice())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DiffBenchConfig, GenerationSection};
    use crate::metadata::build_report_meta;
    use crate::planner::build_plan;
    use diffbench_gen::Strategy;
    use diffbench_report::read_failure_log;
    use diffbench_runner::{CancellationToken, ProgramFamily, RepetitionConfig};
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;

    fn script(dir: &Path, name: &str, body: &str) -> DiffProgram {
        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        DiffProgram {
            name: name.to_string(),
            executable: path,
            family: ProgramFamily::Sequential,
            edit_script: false,
        }
    }

    const STEADY: &str = "echo 'min edit length 4'\n\
                          echo 'Read Input [μs]: 10'\n\
                          echo 'Precompute [μs]: 20'\n\
                          echo 'Solution [μs]: 250'";

    fn single_config_plan() -> GenerationPlan {
        let section = GenerationSection {
            min_file_size: 12,
            max_file_size: 12,
            file_size_steps: 1,
            change_strength_steps: 1,
            chunkiness_steps: 1,
            strategies: vec![Strategy::Add],
            ..Default::default()
        };
        build_plan(&section, 1)
    }

    fn driver(
        programs: Vec<DiffProgram>,
        output_dir: PathBuf,
        token: CancellationToken,
        flush_interval: Duration,
    ) -> BenchmarkDriver {
        let runner = ProcessRunner::new(Duration::from_secs(10)).with_cancellation(token);
        let controller = AdaptiveController::new(RepetitionConfig::default()).unwrap();
        BenchmarkDriver::new(
            runner,
            controller,
            OutputProtocol::v1().unwrap(),
            programs,
            DriverSettings {
                output_dir,
                base_seed: 5,
                num_regens: 2,
                sample_field: "micros_until_len".to_string(),
                flush_interval,
                show_progress: false,
            },
        )
    }

    #[test]
    fn test_run_writes_rows_failures_and_report() {
        let dir = tempfile::tempdir().unwrap();
        let bin = dir.path().join("bin");
        std::fs::create_dir_all(&bin).unwrap();
        let steady = script(&bin, "steady", STEADY);
        let broken = script(&bin, "broken", "echo 'boom' >&2\nexit 3");
        let programs = vec![steady, broken];

        let out = dir.path().join("out");
        let meta = build_report_meta(&DiffBenchConfig::default(), &programs, 5).unwrap();
        let report = driver(programs, out.clone(), CancellationToken::new(), Duration::from_secs(60))
            .run(&single_config_plan(), meta)
            .unwrap();

        assert!(!report.meta.cancelled);
        assert_eq!(report.cells.len(), 2 * 2);
        assert_eq!(report.summary.converged, 2);
        assert_eq!(report.summary.failed, 2);
        for cell in report.cells.iter().filter(|c| c.diff_program == "steady") {
            assert_eq!(cell.repetitions, 5);
            assert_eq!(cell.median_micros, Some(250.0));
        }

        let csv = std::fs::read_to_string(out.join(RESULTS_FILE)).unwrap();
        let mut lines = csv.lines();
        assert!(lines.next().unwrap().starts_with("generation_config_i,input_strategy"));
        assert_eq!(lines.count(), 10);
        assert!(csv.contains(",steady,4,10,20,250,"));

        let failures = read_failure_log(out.join(FAILURES_FILE)).unwrap();
        assert_eq!(failures.len(), 2);
        assert!(failures.iter().all(|f| f.diff_program == "broken"));
        assert!(failures[0].error.contains("boom"));

        assert!(out.join(REPORT_FILE).is_file());
        assert!(out.join("test_cases").is_dir());
    }

    #[test]
    fn test_cancelled_run_writes_partial_report() {
        let dir = tempfile::tempdir().unwrap();
        let steady = script(dir.path(), "steady", STEADY);
        let out = dir.path().join("out");

        let token = CancellationToken::new();
        token.cancel();
        let meta = build_report_meta(&DiffBenchConfig::default(), &[steady.clone()], 5).unwrap();
        let report = driver(vec![steady], out.clone(), token, Duration::from_secs(60))
            .run(&single_config_plan(), meta)
            .unwrap();

        assert!(report.meta.cancelled);
        assert!(report.cells.is_empty());
        let on_disk = diffbench_report::read_json_report(out.join(REPORT_FILE)).unwrap();
        assert!(on_disk.meta.cancelled);
    }

    #[test]
    fn test_interrupted_cell_keeps_streamed_rows() {
        let dir = tempfile::tempdir().unwrap();
        let counter = dir.path().join("count");
        // Three quick runs with spread-out timings, then a hang
        let stalling = script(
            dir.path(),
            "stalling",
            &format!(
                "n=$(cat '{path}' 2>/dev/null || echo 0)\n\
                 n=$((n + 1))\n\
                 echo $n > '{path}'\n\
                 if [ $n -gt 3 ]; then sleep 30; fi\n\
                 echo 'min edit length 4'\n\
                 echo 'Read Input [μs]: 10'\n\
                 echo 'Precompute [μs]: 20'\n\
                 echo \"Solution [μs]: ${{n}}00\"",
                path = counter.display()
            ),
        );
        let out = dir.path().join("out");
        let results = out.join(RESULTS_FILE);

        let token = CancellationToken::new();
        let watcher = {
            let token = token.clone();
            let results = results.clone();
            std::thread::spawn(move || {
                let deadline = Instant::now() + Duration::from_secs(20);
                let mut streamed = false;
                while Instant::now() < deadline {
                    let lines = std::fs::read_to_string(&results)
                        .map(|csv| csv.lines().count())
                        .unwrap_or(0);
                    if lines == 1 + 3 {
                        streamed = true;
                        break;
                    }
                    std::thread::sleep(Duration::from_millis(20));
                }
                token.cancel();
                streamed
            })
        };

        let meta = build_report_meta(&DiffBenchConfig::default(), &[stalling.clone()], 5).unwrap();
        let report = driver(vec![stalling], out.clone(), token, Duration::ZERO)
            .run(&single_config_plan(), meta)
            .unwrap();
        assert!(watcher.join().unwrap(), "rows were not on disk before cancellation");

        assert!(report.meta.cancelled);
        assert_eq!(report.cells.len(), 1);
        let cell = &report.cells[0];
        assert_eq!(cell.stop, StopReason::Cancelled);
        assert_eq!(cell.repetitions, 3);
        assert_eq!(cell.median_micros, Some(200.0));
        assert_eq!(report.summary.cancelled, 1);

        let csv = std::fs::read_to_string(&results).unwrap();
        assert_eq!(csv.lines().count(), 1 + 3);
        for micros in ["100", "200", "300"] {
            assert!(csv.contains(&format!(",{},", micros)), "{}", csv);
        }
    }
}
