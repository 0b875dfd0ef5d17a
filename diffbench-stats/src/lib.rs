#![warn(missing_docs)]
//! diffbench Statistical Engine
//!
//! Statistics used to decide when a timing measurement is good enough:
//! - Distribution-free confidence band on the median (binomial order statistics)
//! - Percentiles over raw samples
//! - Per-cell summary statistics for reports

mod median;
mod percentiles;
mod summary;

pub use median::{
    MedianBand, SortedSamples, binomial_interval, binomial_quantile, median_band,
    median_of_sorted,
};
pub use percentiles::{Percentiles, compute_percentile, compute_percentiles, percentile_of_sorted};
pub use summary::{SummaryStatistics, compute_summary};

/// Default confidence level (95%)
pub const DEFAULT_CONFIDENCE_LEVEL: f64 = 0.95;

/// Default tolerated relative error of the median band (5%)
pub const DEFAULT_MAX_MEDIAN_ERROR: f64 = 0.05;

/// Fewest samples the median band is ever evaluated on
pub const MIN_BAND_SAMPLES: usize = 5;

/// Statistics errors
#[derive(Debug, thiserror::Error)]
pub enum StatsError {
    /// No samples to summarise
    #[error("no samples")]
    Empty,
    /// Confidence level outside (0, 1)
    #[error("confidence level must be in (0, 1), got {0}")]
    InvalidConfidence(f64),
    /// A NaN sample was offered
    #[error("sample is NaN")]
    NotANumber,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constants() {
        assert_eq!(MIN_BAND_SAMPLES, 5);
        assert!((DEFAULT_CONFIDENCE_LEVEL - 0.95).abs() < f64::EPSILON);
        assert!((DEFAULT_MAX_MEDIAN_ERROR - 0.05).abs() < f64::EPSILON);
    }
}
