//! Summary Statistics
//!
//! Per-cell summary over every recorded sample. Nothing is cleaned: with a
//! handful of repetitions per cell an outlier filter would discard signal.

use crate::median::median_of_sorted;
use crate::percentiles::{Percentiles, compute_percentiles};
use serde::{Deserialize, Serialize};

/// Summary of one sample set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryStatistics {
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub percentiles: Percentiles,
    pub sample_count: usize,
}

/// Compute summary statistics. An empty input yields all zeros.
pub fn compute_summary(samples: &[f64]) -> SummaryStatistics {
    let mut sorted: Vec<f64> = samples.iter().copied().filter(|v| !v.is_nan()).collect();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let n = sorted.len();

    let mean = if n == 0 {
        0.0
    } else {
        sorted.iter().sum::<f64>() / n as f64
    };

    let std_dev = if n < 2 {
        0.0
    } else {
        let variance = sorted.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
        variance.sqrt()
    };

    SummaryStatistics {
        mean,
        median: median_of_sorted(&sorted).unwrap_or(0.0),
        std_dev,
        min: sorted.first().copied().unwrap_or(0.0),
        max: sorted.last().copied().unwrap_or(0.0),
        percentiles: compute_percentiles(&sorted),
        sample_count: n,
    }
}

impl SummaryStatistics {
    /// Coefficient of variation in percent
    pub fn coefficient_of_variation(&self) -> f64 {
        if self.mean == 0.0 {
            0.0
        } else {
            (self.std_dev / self.mean) * 100.0
        }
    }
}
