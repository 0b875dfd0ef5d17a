//! Run Manifest
//!
//! `prepare` records the plan it generated test cases for, so `run` can be
//! pointed at the same grid and seed later (or on another machine).

use crate::planner::{GenerationPlan, PlannedConfig};
use anyhow::Context;
use diffbench_gen::{GenerationConfig, TestCasePaths, derive_seed, generate_seeded, write_test_case};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Current manifest schema
pub const MANIFEST_SCHEMA_VERSION: u32 = 1;

/// File name of the manifest inside the output directory
pub const MANIFEST_FILE: &str = "manifest.json";

/// Directory under the output directory holding test cases
pub const TEST_CASES_DIR: &str = "test_cases";

/// Stamp next to a test case's inputs naming the config and seed they were
/// generated from
pub const CASE_STAMP_FILE: &str = "case.json";

/// Persisted plan of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub schema_version: u32,
    pub base_seed: u64,
    pub num_regens: usize,
    /// Configs in unshuffled grid order
    pub configs: Vec<GenerationConfig>,
    /// Grid indices in execution order
    pub order: Vec<usize>,
}

impl Manifest {
    /// Capture `plan`.
    pub fn from_plan(plan: &GenerationPlan, base_seed: u64, num_regens: usize) -> Self {
        let mut configs: Vec<Option<GenerationConfig>> = vec![None; plan.configs.len()];
        for planned in &plan.configs {
            if let Some(slot) = configs.get_mut(planned.index) {
                *slot = Some(planned.config);
            }
        }
        Self {
            schema_version: MANIFEST_SCHEMA_VERSION,
            base_seed,
            num_regens,
            configs: configs.into_iter().flatten().collect(),
            order: plan.configs.iter().map(|p| p.index).collect(),
        }
    }

    /// Rebuild the plan in execution order.
    pub fn plan(&self) -> anyhow::Result<GenerationPlan> {
        let configs = self
            .order
            .iter()
            .map(|&index| {
                self.configs
                    .get(index)
                    .map(|config| PlannedConfig {
                        index,
                        config: *config,
                    })
                    .ok_or_else(|| anyhow::anyhow!("manifest order refers to missing config {}", index))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(GenerationPlan { configs })
    }

    /// Write as pretty JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
        Ok(())
    }

    /// Read and check the schema version.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let json =
            std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        let manifest: Self = serde_json::from_str(&json)
            .with_context(|| format!("parsing {}", path.display()))?;
        if manifest.schema_version != MANIFEST_SCHEMA_VERSION {
            anyhow::bail!(
                "{}: manifest schema {} is not supported (expected {})",
                path.display(),
                manifest.schema_version,
                MANIFEST_SCHEMA_VERSION
            );
        }
        for config in &manifest.configs {
            config.validate()?;
        }
        Ok(manifest)
    }
}

/// Directory of the test case for one (config, regen).
pub fn test_case_dir(output_dir: &Path, config_index: usize, regen_index: usize) -> PathBuf {
    output_dir
        .join(TEST_CASES_DIR)
        .join(format!("{}_{}", config_index, regen_index))
}

/// Origin of a generated test case
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseStamp {
    pub config: GenerationConfig,
    pub seed: u64,
}

/// Return the inputs for (config, regen), generating them if absent.
///
/// Generation is seeded from the coordinates, so regenerating a missing case
/// yields the same files `prepare` would have written. Existing inputs are
/// only reused when their stamp matches the config and seed; anything else
/// in the directory is replaced.
pub fn ensure_test_case(
    output_dir: &Path,
    base_seed: u64,
    planned: &PlannedConfig,
    regen_index: usize,
) -> anyhow::Result<TestCasePaths> {
    let dir = test_case_dir(output_dir, planned.index, regen_index);
    let paths = TestCasePaths::in_dir(&dir);
    let stamp = CaseStamp {
        config: planned.config,
        seed: derive_seed(base_seed, planned.index, regen_index),
    };
    // Compared as text so float fields need not survive a parse
    let stamp_json = serde_json::to_string_pretty(&stamp)?;
    let stamp_path = dir.join(CASE_STAMP_FILE);

    if paths.exists() {
        if std::fs::read_to_string(&stamp_path).ok().as_deref() == Some(stamp_json.as_str()) {
            return Ok(paths);
        }
        tracing::info!(
            "Replacing {}: it was not generated from {} (seed {})",
            dir.display(),
            planned.config.test_case_name(),
            stamp.seed
        );
    }
    if dir.exists() {
        std::fs::remove_dir_all(&dir).with_context(|| format!("removing {}", dir.display()))?;
    }

    let pair = generate_seeded(&planned.config, stamp.seed)
        .with_context(|| format!("generating {}", planned.config.test_case_name()))?;
    let paths = write_test_case(&dir, &pair)?;
    // Written last, so an interrupted write is regenerated next time
    std::fs::write(&stamp_path, stamp_json)
        .with_context(|| format!("writing {}", stamp_path.display()))?;
    tracing::debug!(
        "Generated {} into {} (seed {})",
        planned.config.test_case_name(),
        dir.display(),
        stamp.seed
    );
    Ok(paths)
}
