//! Report Data Structures

use chrono::{DateTime, Utc};
use diffbench_gen::GenerationConfig;
use diffbench_runner::StopReason;
use diffbench_stats::{MedianBand, SummaryStatistics};
use serde::{Deserialize, Serialize};

/// Current report schema
pub const REPORT_SCHEMA_VERSION: u32 = 1;

/// Complete run report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub meta: ReportMeta,
    pub cells: Vec<CellResult>,
    pub summary: ReportSummary,
}

/// Report metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMeta {
    pub schema_version: u32,
    pub version: String,
    pub timestamp: DateTime<Utc>,
    pub git_commit: Option<String>,
    pub base_seed: u64,
    pub system: SystemInfo,
    pub config: ReportConfig,
    /// The run was interrupted and the report is partial
    pub cancelled: bool,
}

/// Runner settings captured in report metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    pub timeout_ms: u64,
    pub min_repetitions: usize,
    pub max_repetitions: usize,
    pub confidence_level: f64,
    pub max_median_error: f64,
    pub sample_field: String,
    pub num_regens: usize,
    pub programs: Vec<String>,
}

/// System information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemInfo {
    pub os: String,
    pub arch: String,
    pub cpu: String,
    pub cpu_cores: u32,
    pub memory_gb: f64,
}

/// Outcome of one (config, regen, program) cell
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CellResult {
    pub generation_config_i: usize,
    pub regen_i: usize,
    pub diff_program: String,
    pub config: GenerationConfig,
    pub repetitions: usize,
    pub timed_out: usize,
    pub median_micros: Option<f64>,
    pub band: Option<MedianBand>,
    pub stop: StopReason,
    pub summary: Option<SummaryStatistics>,
}

/// Totals over all cells
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub total_cells: usize,
    pub converged: usize,
    pub not_converged: usize,
    pub always_timed_out: usize,
    pub failed: usize,
    /// Cells interrupted by cancellation, with the repetitions they had
    #[serde(default)]
    pub cancelled: usize,
    pub total_repetitions: usize,
    pub total_duration_ms: f64,
}

impl ReportSummary {
    /// Tally `cells`.
    pub fn from_cells(cells: &[CellResult], total_duration_ms: f64) -> Self {
        let mut summary = ReportSummary {
            total_cells: cells.len(),
            total_duration_ms,
            ..Default::default()
        };
        for cell in cells {
            summary.total_repetitions += cell.repetitions;
            match cell.stop {
                StopReason::Converged => summary.converged += 1,
                StopReason::BudgetExhausted { .. } => summary.not_converged += 1,
                StopReason::AlwaysTimesOut => summary.always_timed_out += 1,
                StopReason::Failed { .. } => summary.failed += 1,
                StopReason::Cancelled => summary.cancelled += 1,
            }
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use diffbench_gen::Distribution;

    fn cell(stop: StopReason, repetitions: usize) -> CellResult {
        CellResult {
            generation_config_i: 0,
            regen_i: 0,
            diff_program: "sequential".to_string(),
            config: GenerationConfig::independent(10, Distribution::Uniform),
            repetitions,
            timed_out: 0,
            median_micros: None,
            band: None,
            stop,
            summary: None,
        }
    }

    #[test]
    fn test_summary_tallies_stop_reasons() {
        let cells = vec![
            cell(StopReason::Converged, 5),
            cell(StopReason::Converged, 7),
            cell(
                StopReason::BudgetExhausted {
                    lower: 1.0,
                    upper: 3.0,
                    median: 2.0,
                },
                50,
            ),
            cell(StopReason::AlwaysTimesOut, 5),
            cell(
                StopReason::Failed {
                    error: "boom".into(),
                },
                0,
            ),
            cell(StopReason::Cancelled, 3),
        ];
        let summary = ReportSummary::from_cells(&cells, 12.5);
        assert_eq!(summary.total_cells, 6);
        assert_eq!(summary.converged, 2);
        assert_eq!(summary.not_converged, 1);
        assert_eq!(summary.always_timed_out, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.cancelled, 1);
        assert_eq!(summary.total_repetitions, 70);
    }
}
