//! Golden Validation
//!
//! Checks configured programs against `diff --minimal` on randomly drawn
//! generation configs. A program fails a case when its edit length differs
//! from the golden count, or when the edit script it wrote does not turn
//! sequence A into sequence B in exactly that many operations.

use diffbench_gen::{
    Distribution, GenerationConfig, Strategy, TestCasePaths, apply_edit_script, generate,
    read_edit_script, write_test_case,
};
use diffbench_runner::{DiffProgram, OutputProtocol, ProcessRunner, RunnerError};
use rand::Rng;
use rand::distributions::{Distribution as _, WeightedIndex};
use std::io::Write;
use std::path::PathBuf;

const STRATEGY_WEIGHTS: [(Strategy, f64); 4] = [
    (Strategy::Independent, 0.1),
    (Strategy::Add, 0.2),
    (Strategy::Remove, 0.2),
    (Strategy::AddRemove, 0.5),
];

/// Settings of a validation run
#[derive(Debug, Clone)]
pub struct ValidationOptions {
    /// Number of random cases
    pub num_tests: usize,
    /// Stop at the first failing case
    pub early_stop: bool,
    /// Directory receiving one test case directory per case
    pub work_dir: PathBuf,
}

/// Result of one program on one case
#[derive(Debug, Clone, PartialEq)]
pub struct ProgramCheck {
    pub program: String,
    pub min_edit_len: Option<u64>,
    pub micros_until_len: Option<u64>,
    /// Why the check failed, if it did
    pub problem: Option<String>,
}

impl ProgramCheck {
    /// Whether the program agreed with the golden diff
    pub fn passed(&self) -> bool {
        self.problem.is_none()
    }
}

/// Totals of a validation run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidationSummary {
    pub cases_run: usize,
    pub cases_failed: usize,
}

impl ValidationSummary {
    /// Whether every case passed
    pub fn all_passed(&self) -> bool {
        self.cases_failed == 0
    }
}

/// Draw a random generation config.
///
/// Lengths span several orders of magnitude; change strengths are usually
/// small so most cases have a short edit script.
pub fn random_generation_config<R: Rng + ?Sized>(rng: &mut R) -> GenerationConfig {
    let distribution = if rng.gen_bool(0.25) {
        Distribution::Uniform
    } else {
        Distribution::Zipf
    };
    let weights = STRATEGY_WEIGHTS.map(|(_, w)| w);
    let strategy = match WeightedIndex::new(weights) {
        Ok(index) => STRATEGY_WEIGHTS[index.sample(rng)].0,
        Err(_) => Strategy::AddRemove,
    };
    let magnitude: u32 = rng.gen_range(2..5);
    let length_1 = rng.gen_range(1..10usize.pow(magnitude));

    if strategy == Strategy::Independent {
        return GenerationConfig::independent(length_1, distribution);
    }

    let scale = if rng.gen_bool(0.75) { 0.3 } else { 1.0 };
    GenerationConfig {
        strategy,
        length_1,
        // 1 - [0, 1) keeps the strength away from zero
        change_strength: (1.0 - rng.gen::<f64>()) * scale,
        chunkiness: rng.gen::<f64>(),
        distribution,
    }
}

/// Runs validation cases
pub struct Validator<'a> {
    runner: &'a ProcessRunner,
    protocol: &'a OutputProtocol,
    golden: DiffProgram,
    programs: &'a [DiffProgram],
}

impl<'a> Validator<'a> {
    /// Validate `programs` against `golden`
    pub fn new(
        runner: &'a ProcessRunner,
        protocol: &'a OutputProtocol,
        golden: DiffProgram,
        programs: &'a [DiffProgram],
    ) -> Self {
        Self {
            runner,
            protocol,
            golden,
            programs,
        }
    }

    /// Run `options.num_tests` random cases, printing PASS/FAIL lines to `out`.
    pub fn run<R: Rng + ?Sized, W: Write>(
        &self,
        rng: &mut R,
        options: &ValidationOptions,
        out: &mut W,
    ) -> anyhow::Result<ValidationSummary> {
        let mut summary = ValidationSummary::default();

        for i in 0..options.num_tests {
            let config = random_generation_config(rng);
            let pair = generate(rng, &config)?;
            let paths = write_test_case(options.work_dir.join(i.to_string()), &pair)?;
            writeln!(out, "{} {}", i, config.test_case_name())?;

            let golden = self.golden.run(self.runner, self.protocol, &paths.first, &paths.second, None);
            let golden_len = match golden.and_then(|run| run.min_edit_len()) {
                Ok(len) => len,
                Err(RunnerError::Cancelled) => return Err(RunnerError::Cancelled.into()),
                Err(e) => anyhow::bail!("golden diff failed: {}", e),
            };

            let mut failed = false;
            for program in self.programs {
                let check = self.check_program(program, &paths, &pair.a, &pair.b, golden_len)?;
                if check.passed() {
                    writeln!(
                        out,
                        "  {:<20} {:>10} edits {:>12} μs",
                        check.program,
                        golden_len,
                        check.micros_until_len.unwrap_or(0)
                    )?;
                } else {
                    failed = true;
                    writeln!(
                        out,
                        "  {:<20} {}",
                        check.program,
                        check.problem.as_deref().unwrap_or_default()
                    )?;
                }
            }

            summary.cases_run += 1;
            if failed {
                summary.cases_failed += 1;
                writeln!(out, "FAIL\n")?;
                if options.early_stop {
                    break;
                }
            } else {
                writeln!(out, "PASS\n")?;
            }
        }

        Ok(summary)
    }

    fn check_program(
        &self,
        program: &DiffProgram,
        paths: &TestCasePaths,
        a: &[u32],
        b: &[u32],
        golden_len: u64,
    ) -> anyhow::Result<ProgramCheck> {
        let script_path = program
            .edit_script
            .then(|| paths.dir.join(format!("{}.script", program.name)));
        let mut check = ProgramCheck {
            program: program.name.clone(),
            min_edit_len: None,
            micros_until_len: None,
            problem: None,
        };

        let run = match program.run(
            self.runner,
            self.protocol,
            &paths.first,
            &paths.second,
            script_path.as_deref(),
        ) {
            Ok(run) => run,
            Err(RunnerError::Cancelled) => return Err(RunnerError::Cancelled.into()),
            Err(e) => {
                check.problem = Some(e.to_string());
                return Ok(check);
            }
        };
        check.micros_until_len = run.fields.get(diffbench_runner::MICROS_UNTIL_LEN);

        let len = match run.min_edit_len() {
            Ok(len) => len,
            Err(e) => {
                check.problem = Some(e.to_string());
                return Ok(check);
            }
        };
        check.min_edit_len = Some(len);
        if len != golden_len {
            check.problem = Some(format!("want {} got {}", golden_len, len));
            return Ok(check);
        }

        if let Some(path) = script_path {
            check.problem = verify_edit_script(&path, a, b, golden_len);
        }
        Ok(check)
    }
}

/// Check a written edit script; returns the problem found, if any.
fn verify_edit_script(path: &std::path::Path, a: &[u32], b: &[u32], golden_len: u64) -> Option<String> {
    let ops = match read_edit_script(path) {
        Ok(ops) => ops,
        Err(e) => return Some(format!("unreadable edit script: {}", e)),
    };
    if ops.len() as u64 != golden_len {
        return Some(format!(
            "edit script has {} operations, want {}",
            ops.len(),
            golden_len
        ));
    }
    match apply_edit_script(a, &ops) {
        Ok(result) if result == b => None,
        Ok(_) => Some("edit script does not produce the second input".to_string()),
        Err(e) => Some(format!("edit script does not apply: {}", e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use diffbench_runner::ProgramFamily;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::os::unix::fs::PermissionsExt;
    use std::time::Duration;

    fn script(dir: &std::path::Path, name: &str, body: &str) -> DiffProgram {
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

    #[test]
    fn test_random_configs_are_valid() {
        let mut rng = StdRng::seed_from_u64(0);
        for _ in 0..500 {
            let config = random_generation_config(&mut rng);
            config.validate().unwrap();
            assert!(config.length_1 < 10_000);
            if config.strategy != Strategy::Independent {
                assert!(config.change_strength > 0.0);
            }
        }
    }

    #[test]
    fn test_golden_against_itself_passes() {
        if std::process::Command::new("diff").arg("--version").output().is_err() {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let runner = ProcessRunner::new(Duration::from_secs(30));
        let protocol = OutputProtocol::v1().unwrap();
        let programs = [DiffProgram {
            name: "again".to_string(),
            ..DiffProgram::golden()
        }];
        let validator = Validator::new(&runner, &protocol, DiffProgram::golden(), &programs);

        let mut out = Vec::new();
        let summary = validator
            .run(
                &mut StdRng::seed_from_u64(3),
                &ValidationOptions {
                    num_tests: 3,
                    early_stop: false,
                    work_dir: dir.path().to_path_buf(),
                },
                &mut out,
            )
            .unwrap();
        assert_eq!(summary.cases_run, 3);
        assert!(summary.all_passed());
        assert_eq!(String::from_utf8(out).unwrap().matches("PASS").count(), 3);
    }

    #[test]
    fn test_wrong_length_fails_and_stops_early() {
        if std::process::Command::new("diff").arg("--version").output().is_err() {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let liar = script(
            dir.path(),
            "liar",
            "echo 'min edit length 999999'\n\
             echo 'Read Input [μs]: 1'\n\
             echo 'Precompute [μs]: 1'\n\
             echo 'Solution [μs]: 1'",
        );
        let runner = ProcessRunner::new(Duration::from_secs(30));
        let protocol = OutputProtocol::v1().unwrap();
        let programs = [liar];
        let validator = Validator::new(&runner, &protocol, DiffProgram::golden(), &programs);

        let mut out = Vec::new();
        let summary = validator
            .run(
                &mut StdRng::seed_from_u64(3),
                &ValidationOptions {
                    num_tests: 5,
                    early_stop: true,
                    work_dir: dir.path().join("cases"),
                },
                &mut out,
            )
            .unwrap();
        assert_eq!(summary.cases_run, 1);
        assert_eq!(summary.cases_failed, 1);
        assert!(String::from_utf8(out).unwrap().contains("want "));
    }

    #[test]
    fn test_edit_script_verification() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("script.txt");
        std::fs::write(&path, "1 -\n2 + 9\n").unwrap();
        assert_eq!(verify_edit_script(&path, &[1, 2, 3], &[2, 9, 3], 2), None);
        assert!(verify_edit_script(&path, &[1, 2, 3], &[2, 3], 2).is_some());
        assert!(verify_edit_script(&path, &[1, 2, 3], &[2, 9, 3], 3).is_some());
    }
}
