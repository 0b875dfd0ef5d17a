//! Generation Configuration
//!
//! A [`GenerationConfig`] names one cell of the benchmark grid: which edit
//! strategy derives the second sequence from the first, how long the first
//! sequence is, how strong and how clustered the edits are, and which symbol
//! distribution the alphabet follows.

use crate::error::GenError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How sequence B is derived from sequence A
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Two unrelated sequences of the same length
    Independent,
    /// Insert freshly sampled symbols into A
    Add,
    /// Delete a masked subset of A
    Remove,
    /// Insert, then delete a proportional share of the result
    AddRemove,
}

impl Strategy {
    /// Every strategy, in grid order
    pub const ALL: [Strategy; 4] = [
        Strategy::Independent,
        Strategy::Add,
        Strategy::Remove,
        Strategy::AddRemove,
    ];

    /// Stable lowercase name used in file names and CSV rows
    pub fn name(self) -> &'static str {
        match self {
            Strategy::Independent => "independent",
            Strategy::Add => "add",
            Strategy::Remove => "remove",
            Strategy::AddRemove => "addremove",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Strategy {
    type Err = GenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "independent" => Ok(Strategy::Independent),
            "add" => Ok(Strategy::Add),
            "remove" => Ok(Strategy::Remove),
            "addremove" => Ok(Strategy::AddRemove),
            other => Err(GenError::invalid(format!("unsupported strategy {}", other))),
        }
    }
}

/// Symbol frequency distribution of the generated alphabet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Distribution {
    /// Every symbol equally likely
    Uniform,
    /// Weight of symbol `i` proportional to `1 / (i + 1)`
    Zipf,
}

impl Distribution {
    /// Stable lowercase name
    pub fn name(self) -> &'static str {
        match self {
            Distribution::Uniform => "uniform",
            Distribution::Zipf => "zipf",
        }
    }
}

impl fmt::Display for Distribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Distribution {
    type Err = GenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "uniform" => Ok(Distribution::Uniform),
            "zipf" => Ok(Distribution::Zipf),
            other => Err(GenError::invalid(format!(
                "unsupported distribution {}",
                other
            ))),
        }
    }
}

/// One cell of the generation grid
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Edit strategy
    pub strategy: Strategy,
    /// Length of sequence A (also the alphabet size)
    pub length_1: usize,
    /// Fraction of elements affected, in (0, 1]
    pub change_strength: f64,
    /// Clustering of edits, in [0, 1]
    pub chunkiness: f64,
    /// Symbol distribution
    pub distribution: Distribution,
}

impl GenerationConfig {
    /// Config for the `independent` strategy, which has no edits to control.
    pub fn independent(length_1: usize, distribution: Distribution) -> Self {
        Self {
            strategy: Strategy::Independent,
            length_1,
            change_strength: 1.0,
            chunkiness: 0.0,
            distribution,
        }
    }

    /// Check every field against its domain.
    pub fn validate(&self) -> Result<(), GenError> {
        if self.length_1 == 0 {
            return Err(GenError::invalid("length_1 must be positive"));
        }
        if !(self.change_strength > 0.0 && self.change_strength <= 1.0) {
            return Err(GenError::invalid(format!(
                "change_strength must be in (0, 1], got {}",
                self.change_strength
            )));
        }
        if !(0.0..=1.0).contains(&self.chunkiness) {
            return Err(GenError::invalid(format!(
                "chunkiness must be in [0, 1], got {}",
                self.chunkiness
            )));
        }
        if self.strategy == Strategy::Independent
            && (self.change_strength != 1.0 || self.chunkiness != 0.0)
        {
            return Err(GenError::invalid(format!(
                "independent strategy requires change_strength = 1 and chunkiness = 0, got {} and {}",
                self.change_strength, self.chunkiness
            )));
        }
        Ok(())
    }

    /// Directory-safe name describing this config.
    pub fn test_case_name(&self) -> String {
        format!(
            "random_{}_{}_{:.2}_{:.2}_{}",
            self.strategy, self.length_1, self.change_strength, self.chunkiness, self.distribution
        )
    }
}
