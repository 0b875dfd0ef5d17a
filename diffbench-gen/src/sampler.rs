//! Symbol Sampling
//!
//! Draws symbols with replacement from `0..value_range`. The Zipf variant
//! favours low symbols so generated files look like text with a skewed line
//! frequency rather than pure noise.

use crate::config::Distribution;
use crate::error::GenError;
use crate::Sequence;
use rand::distributions::{Distribution as _, WeightedIndex};
use rand::Rng;

/// Sampler over a fixed alphabet `0..value_range`
#[derive(Debug, Clone)]
pub struct WeightedSampler {
    value_range: u32,
    weights: Option<WeightedIndex<f64>>,
}

impl WeightedSampler {
    /// Build a sampler for `distribution` over `0..value_range`.
    pub fn new(distribution: Distribution, value_range: usize) -> Result<Self, GenError> {
        if value_range == 0 {
            return Err(GenError::invalid("value_range must be positive"));
        }
        let value_range = u32::try_from(value_range).map_err(|_| {
            GenError::invalid(format!("value_range {} exceeds u32 symbols", value_range))
        })?;

        let weights = match distribution {
            Distribution::Uniform => None,
            Distribution::Zipf => {
                let index = WeightedIndex::new((0..value_range).map(|i| 1.0 / (i as f64 + 1.0)))
                    .map_err(|e| GenError::invalid(format!("zipf weights: {}", e)))?;
                Some(index)
            }
        };

        Ok(Self {
            value_range,
            weights,
        })
    }

    /// Alphabet size
    pub fn value_range(&self) -> usize {
        self.value_range as usize
    }

    /// Draw `length` independent symbols.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R, length: usize) -> Sequence {
        match &self.weights {
            None => (0..length)
                .map(|_| rng.gen_range(0..self.value_range))
                .collect(),
            Some(index) => (0..length).map(|_| index.sample(rng) as u32).collect(),
        }
    }
}

/// One-shot convenience wrapper around [`WeightedSampler`].
pub fn sample<R: Rng + ?Sized>(
    rng: &mut R,
    length: usize,
    distribution: Distribution,
    value_range: usize,
) -> Result<Sequence, GenError> {
    Ok(WeightedSampler::new(distribution, value_range)?.sample(rng, length))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_symbols_stay_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        for distribution in [Distribution::Uniform, Distribution::Zipf] {
            let values = sample(&mut rng, 1000, distribution, 13).unwrap();
            assert_eq!(values.len(), 1000);
            assert!(values.iter().all(|&v| v < 13));
        }
    }

    #[test]
    fn test_zipf_favours_low_symbols() {
        let mut rng = StdRng::seed_from_u64(42);
        let values = sample(&mut rng, 20_000, Distribution::Zipf, 100).unwrap();
        let zeros = values.iter().filter(|&&v| v == 0).count();
        let nineties = values.iter().filter(|&&v| v == 90).count();
        // Expected ratio is 91:1
        assert!(zeros > nineties * 20, "zeros={} nineties={}", zeros, nineties);
    }

    #[test]
    fn test_uniform_is_roughly_flat() {
        let mut rng = StdRng::seed_from_u64(3);
        let values = sample(&mut rng, 40_000, Distribution::Uniform, 4).unwrap();
        for symbol in 0..4 {
            let count = values.iter().filter(|&&v| v == symbol).count();
            assert!((9_000..11_000).contains(&count), "symbol {} drawn {}", symbol, count);
        }
    }

    #[test]
    fn test_empty_alphabet_rejected() {
        assert!(matches!(
            WeightedSampler::new(Distribution::Uniform, 0),
            Err(GenError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_same_seed_same_symbols() {
        let a = sample(&mut StdRng::seed_from_u64(9), 50, Distribution::Zipf, 50).unwrap();
        let b = sample(&mut StdRng::seed_from_u64(9), 50, Distribution::Zipf, 50).unwrap();
        assert_eq!(a, b);
    }
}
