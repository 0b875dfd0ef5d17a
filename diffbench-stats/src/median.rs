//! Median Confidence Bands
//!
//! Distribution-free confidence interval for the median (Le Boudec,
//! "Performance Evaluation of Computer and Communication Systems", 2.2.1).
//! For `n` sorted samples, the order statistics at the Binomial(n, 1/2)
//! quantiles bracket the true median with the requested confidence. No
//! normality assumption is made, which suits skewed latency samples.

use crate::StatsError;
use serde::{Deserialize, Serialize};

/// Samples kept in ascending order as they arrive.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SortedSamples {
    values: Vec<f64>,
}

impl SortedSamples {
    /// Empty sample set
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert keeping ascending order. NaN is rejected.
    pub fn insert(&mut self, value: f64) -> Result<(), StatsError> {
        if value.is_nan() {
            return Err(StatsError::NotANumber);
        }
        let at = self.values.partition_point(|&v| v <= value);
        self.values.insert(at, value);
        Ok(())
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no sample has been recorded
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Samples in ascending order
    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    /// Median of the recorded samples
    pub fn median(&self) -> Option<f64> {
        median_of_sorted(&self.values)
    }
}

impl FromIterator<f64> for SortedSamples {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        let mut values: Vec<f64> = iter.into_iter().filter(|v| !v.is_nan()).collect();
        values.sort_by(|a, b| a.total_cmp(b));
        Self { values }
    }
}

/// Median of an ascending slice: the middle element, or the mean of the two
/// middle elements for an even count.
pub fn median_of_sorted(sorted: &[f64]) -> Option<f64> {
    let n = sorted.len();
    if n == 0 {
        return None;
    }
    let mid = n / 2;
    if n % 2 == 1 {
        Some(sorted[mid])
    } else {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    }
}

/// Smallest `k` with `P(X <= k) >= q` for `X ~ Binomial(n, p)`.
pub fn binomial_quantile(n: usize, p: f64, q: f64) -> usize {
    if q <= 0.0 {
        return 0;
    }
    if p <= 0.0 {
        return 0;
    }
    if p >= 1.0 {
        return n;
    }

    let ln_p = p.ln();
    let ln_q = (1.0 - p).ln();
    let mut ln_choose = 0.0_f64;
    let mut cdf = 0.0_f64;

    for k in 0..=n {
        if k > 0 {
            // ln C(n, k) = ln C(n, k-1) + ln(n-k+1) - ln(k)
            ln_choose += ((n - k + 1) as f64).ln() - (k as f64).ln();
        }
        cdf += (ln_choose + k as f64 * ln_p + (n - k) as f64 * ln_q).exp();
        if cdf >= q - 1e-12 {
            return k;
        }
    }
    n
}

/// Central interval `[lo, hi]` of Binomial(n, 1/2) holding `confidence` mass,
/// as one-based ranks.
pub fn binomial_interval(n: usize, confidence: f64) -> (usize, usize) {
    let tail = (1.0 - confidence) / 2.0;
    (
        binomial_quantile(n, 0.5, tail),
        binomial_quantile(n, 0.5, 1.0 - tail),
    )
}

/// Confidence band around the median of a sorted sample set
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MedianBand {
    /// Sample median
    pub median: f64,
    /// Lower order statistic bounding the median
    pub lower: f64,
    /// Upper order statistic bounding the median
    pub upper: f64,
    /// Zero-based index of `lower`
    pub lower_index: usize,
    /// Zero-based index of `upper`
    pub upper_index: usize,
}

impl MedianBand {
    /// Whether the band lies within `max_relative_error` of the median on
    /// both sides.
    pub fn is_within(&self, max_relative_error: f64) -> bool {
        self.lower >= (1.0 - max_relative_error) * self.median
            && self.upper <= (1.0 + max_relative_error) * self.median
    }

    /// Band width relative to the median
    pub fn relative_width(&self) -> f64 {
        if self.median == 0.0 {
            0.0
        } else {
            (self.upper - self.lower) / self.median
        }
    }
}

/// Compute the median confidence band for ascending `sorted` samples.
///
/// Binomial ranks are shifted to zero-based indices and clamped into the
/// sample range; for small `n` the lower rank can be zero.
pub fn median_band(sorted: &[f64], confidence: f64) -> Result<MedianBand, StatsError> {
    if !(confidence > 0.0 && confidence < 1.0) {
        return Err(StatsError::InvalidConfidence(confidence));
    }
    let median = median_of_sorted(sorted).ok_or(StatsError::Empty)?;

    let n = sorted.len();
    let (lo, hi) = binomial_interval(n, confidence);
    let lower_index = lo.saturating_sub(1).min(n - 1);
    let upper_index = hi.saturating_sub(1).min(n - 1);

    Ok(MedianBand {
        median,
        lower: sorted[lower_index],
        upper: sorted[upper_index],
        lower_index,
        upper_index,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_median_odd_and_even() {
        assert_eq!(median_of_sorted(&[1.0, 2.0, 9.0]), Some(2.0));
        assert_eq!(median_of_sorted(&[1.0, 2.0, 4.0, 9.0]), Some(3.0));
        assert_eq!(median_of_sorted(&[]), None);
    }

    #[test]
    fn test_sorted_insert_keeps_order() {
        let mut samples = SortedSamples::new();
        for v in [5.0, 1.0, 3.0, 3.0, 10.0, 0.5] {
            samples.insert(v).unwrap();
        }
        assert_eq!(samples.as_slice(), &[0.5, 1.0, 3.0, 3.0, 5.0, 10.0]);
        assert_eq!(samples.median(), Some(3.0));
        assert!(samples.insert(f64::NAN).is_err());
        assert_eq!(samples.len(), 6);
    }

    #[test]
    fn test_binomial_quantile_small_n() {
        // Binomial(5, 0.5): cdf(0) = 1/32, cdf(4) = 31/32
        assert_eq!(binomial_quantile(5, 0.5, 0.025), 0);
        assert_eq!(binomial_quantile(5, 0.5, 0.975), 5);
        assert_eq!(binomial_quantile(5, 0.5, 0.5), 2);
        assert_eq!(binomial_quantile(10, 0.5, 0.0), 0);
    }

    #[test]
    fn test_binomial_interval_known_values() {
        // Matches scipy.stats.binom.interval(0.95, n, 0.5)
        assert_eq!(binomial_interval(10, 0.95), (2, 8));
        assert_eq!(binomial_interval(20, 0.95), (6, 14));
        assert_eq!(binomial_interval(100, 0.95), (40, 60));
    }

    #[test]
    fn test_band_for_constant_samples_is_tight() {
        let samples = vec![42.0; 5];
        let band = median_band(&samples, 0.95).unwrap();
        assert_eq!(band.lower_index, 0);
        assert_eq!(band.upper_index, 4);
        assert!(band.is_within(0.0));
        assert_eq!(band.relative_width(), 0.0);
    }

    #[test]
    fn test_band_indices_for_larger_n() {
        let samples: Vec<f64> = (1..=100).map(|x| x as f64).collect();
        let band = median_band(&samples, 0.95).unwrap();
        assert_eq!(band.lower_index, 39);
        assert_eq!(band.upper_index, 59);
        assert_eq!(band.lower, 40.0);
        assert_eq!(band.upper, 60.0);
        assert!((band.median - 50.5).abs() < 1e-12);
        assert!(!band.is_within(0.05));
        assert!(band.is_within(0.25));
    }

    proptest::proptest! {
        #[test]
        fn band_brackets_median(
            values in proptest::collection::vec(0.0f64..1e6, 5..200),
            confidence in 0.9f64..0.999,
        ) {
            let sorted: SortedSamples = values.into_iter().collect();
            let band = median_band(sorted.as_slice(), confidence).unwrap();
            proptest::prop_assert!(band.lower_index <= band.upper_index);
            proptest::prop_assert!(band.upper_index < sorted.len());
            proptest::prop_assert!(band.lower <= band.median && band.median <= band.upper);
        }
    }

    #[test]
    fn test_band_rejects_bad_input() {
        assert!(matches!(median_band(&[], 0.95), Err(StatsError::Empty)));
        assert!(matches!(
            median_band(&[1.0], 1.0),
            Err(StatsError::InvalidConfidence(_))
        ));
    }
}
