//! Adaptive Repetition
//!
//! Repeats a measurement until the confidence band on the median is tight
//! relative to the median itself, instead of running a fixed count.
//!
//! ## Stopping rules
//!
//! After every sample, in this order:
//! 1. [`TIMEOUT_STREAK`] consecutive timeouts: the cell always times out.
//! 2. At least `max(min_repetitions, 5)` samples and the median band within
//!    `max_median_error`: converged.
//! 3. `max_repetitions` samples: budget exhausted (soft, samples are kept).
//!
//! A timed-out run contributes its timeout as a sample. Any other error ends
//! the cell. Cancellation ends it too, keeping the repetitions taken so far.

use crate::error::RunnerError;
use diffbench_stats::{MIN_BAND_SAMPLES, MedianBand, SortedSamples, median_band};
use serde::{Deserialize, Serialize};

/// Consecutive timeouts after which a cell is given up
pub const TIMEOUT_STREAK: usize = 5;

/// Repetition limits and the convergence target
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RepetitionConfig {
    pub min_repetitions: usize,
    pub max_repetitions: usize,
    pub confidence_level: f64,
    pub max_median_error: f64,
}

impl Default for RepetitionConfig {
    fn default() -> Self {
        Self {
            min_repetitions: 5,
            max_repetitions: 50,
            confidence_level: diffbench_stats::DEFAULT_CONFIDENCE_LEVEL,
            max_median_error: diffbench_stats::DEFAULT_MAX_MEDIAN_ERROR,
        }
    }
}

impl RepetitionConfig {
    /// Reject unusable limits
    pub fn validate(&self) -> Result<(), RunnerError> {
        if self.max_repetitions == 0 {
            return Err(RunnerError::InvalidConfiguration(
                "max_repetitions must be at least 1".to_string(),
            ));
        }
        if self.min_repetitions > self.max_repetitions {
            return Err(RunnerError::InvalidConfiguration(format!(
                "min_repetitions ({}) exceeds max_repetitions ({})",
                self.min_repetitions, self.max_repetitions
            )));
        }
        if !(self.confidence_level > 0.0 && self.confidence_level < 1.0) {
            return Err(RunnerError::InvalidConfiguration(format!(
                "confidence_level must be in (0, 1), got {}",
                self.confidence_level
            )));
        }
        if self.max_median_error.is_nan() || self.max_median_error < 0.0 {
            return Err(RunnerError::InvalidConfiguration(format!(
                "max_median_error must be non-negative, got {}",
                self.max_median_error
            )));
        }
        Ok(())
    }

    /// Sample count from which the band is evaluated
    pub fn first_check(&self) -> usize {
        self.min_repetitions.max(MIN_BAND_SAMPLES)
    }
}

/// Outcome of one repetition
#[derive(Debug, Clone, PartialEq)]
pub enum Repetition<T> {
    /// Finished; `micros` is the sampled value
    Completed { value: T, micros: f64 },
    /// Hit the timeout; the timeout itself is the sample
    TimedOut { micros: f64 },
}

impl<T> Repetition<T> {
    /// The value entered into the sample set
    pub fn micros(&self) -> f64 {
        match self {
            Repetition::Completed { micros, .. } | Repetition::TimedOut { micros } => *micros,
        }
    }

    /// Whether the run timed out
    pub fn timed_out(&self) -> bool {
        matches!(self, Repetition::TimedOut { .. })
    }
}

/// Why a cell stopped repeating
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StopReason {
    /// Median band within tolerance
    Converged,
    /// Ran out of repetitions before converging
    BudgetExhausted { lower: f64, upper: f64, median: f64 },
    /// Every recent run hit the timeout
    AlwaysTimesOut,
    /// A run failed with a non-timeout error
    Failed { error: String },
    /// The operator cancelled the run mid-cell
    Cancelled,
}

impl StopReason {
    /// Short label for logs and summaries
    pub fn label(&self) -> &'static str {
        match self {
            StopReason::Converged => "converged",
            StopReason::BudgetExhausted { .. } => "budget_exhausted",
            StopReason::AlwaysTimesOut => "always_times_out",
            StopReason::Failed { .. } => "failed",
            StopReason::Cancelled => "cancelled",
        }
    }
}

/// All repetitions of one cell and why they stopped
#[derive(Debug, Clone)]
pub struct Measurement<T> {
    pub repetitions: Vec<Repetition<T>>,
    pub samples: SortedSamples,
    /// Band at the last evaluation, if any was possible
    pub band: Option<MedianBand>,
    pub stop: StopReason,
}

impl<T> Measurement<T> {
    /// Median of all recorded samples
    pub fn median(&self) -> Option<f64> {
        self.samples.median()
    }
}

/// Drives repetitions of one measurement
#[derive(Debug, Clone)]
pub struct AdaptiveController {
    config: RepetitionConfig,
}

impl AdaptiveController {
    /// Controller with validated limits
    pub fn new(config: RepetitionConfig) -> Result<Self, RunnerError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Limits in use
    pub fn config(&self) -> &RepetitionConfig {
        &self.config
    }

    /// Repeat `run_fn` until a stopping rule fires.
    ///
    /// `run_fn` receives the repetition index and returns the run's value and
    /// its sample in microseconds. Failures, including cancellation, end the
    /// cell with a [`StopReason`] rather than an error.
    pub fn measure<T, F>(&self, run_fn: F) -> Result<Measurement<T>, RunnerError>
    where
        F: FnMut(usize) -> Result<(T, f64), RunnerError>,
    {
        self.measure_with(run_fn, |_, _| Ok(()))
    }

    /// Like [`measure`](Self::measure), handing every repetition to
    /// `on_repetition` as soon as it is recorded.
    ///
    /// An error from `on_repetition` aborts the measurement and is returned.
    pub fn measure_with<T, E, F, G>(
        &self,
        mut run_fn: F,
        mut on_repetition: G,
    ) -> Result<Measurement<T>, E>
    where
        E: From<RunnerError>,
        F: FnMut(usize) -> Result<(T, f64), RunnerError>,
        G: FnMut(usize, &Repetition<T>) -> Result<(), E>,
    {
        let config = &self.config;
        let mut repetitions = Vec::new();
        let mut samples = SortedSamples::new();
        let mut band = None;
        let mut timeout_streak = 0;

        let stop = loop {
            let index = repetitions.len();
            let repetition = match run_fn(index) {
                Ok((value, micros)) => {
                    timeout_streak = 0;
                    Repetition::Completed { value, micros }
                }
                Err(RunnerError::Timeout { after }) => {
                    timeout_streak += 1;
                    Repetition::TimedOut {
                        micros: after.as_micros() as f64,
                    }
                }
                Err(RunnerError::Cancelled) => break StopReason::Cancelled,
                Err(err) => {
                    break StopReason::Failed {
                        error: err.to_string(),
                    };
                }
            };

            samples
                .insert(repetition.micros())
                .map_err(|e| RunnerError::InvalidConfiguration(e.to_string()))?;
            on_repetition(index, &repetition)?;
            repetitions.push(repetition);

            if timeout_streak >= TIMEOUT_STREAK {
                break StopReason::AlwaysTimesOut;
            }

            let count = samples.len();
            if count >= config.first_check() {
                let current = median_band(samples.as_slice(), config.confidence_level)
                    .map_err(|e| RunnerError::InvalidConfiguration(e.to_string()))?;
                band = Some(current);
                if current.is_within(config.max_median_error) {
                    break StopReason::Converged;
                }
            }

            if count >= config.max_repetitions {
                let current = match band {
                    Some(b) => b,
                    None => median_band(samples.as_slice(), config.confidence_level)
                        .map_err(|e| RunnerError::InvalidConfiguration(e.to_string()))?,
                };
                band = Some(current);
                tracing::warn!(
                    repetitions = count,
                    lower = current.lower,
                    upper = current.upper,
                    median = current.median,
                    "failed to reach confidence"
                );
                break StopReason::BudgetExhausted {
                    lower: current.lower,
                    upper: current.upper,
                    median: current.median,
                };
            }
        };

        tracing::debug!(
            repetitions = repetitions.len(),
            stop = stop.label(),
            "measurement finished"
        );

        Ok(Measurement {
            repetitions,
            samples,
            band,
            stop,
        })
    }
}
