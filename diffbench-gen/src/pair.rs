//! Edit Pair Generation
//!
//! Composes sampling, masking and merging into the named strategies. Only
//! the two final sequences leave this module; which positions were inserted
//! or deleted is not recorded, and consumers recompute the edit distance
//! with a trusted diff.

use crate::config::{GenerationConfig, Strategy};
use crate::error::GenError;
use crate::mask::build_chunky_mask;
use crate::merge::merge;
use crate::sampler::WeightedSampler;
use crate::Sequence;
use rand::Rng;

/// Two sequences produced from one [`GenerationConfig`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditPair {
    /// Original sequence
    pub a: Sequence,
    /// Sequence derived from `a` by the configured strategy
    pub b: Sequence,
}

/// Strength of the removal pass in `addremove`, chosen so the expected final
/// length stays close to the starting length.
pub fn addremove_removal_strength(change_strength: f64) -> f64 {
    1.0 - 1.0 / (1.0 + change_strength)
}

/// Generate one edit pair.
pub fn generate<R: Rng + ?Sized>(
    rng: &mut R,
    config: &GenerationConfig,
) -> Result<EditPair, GenError> {
    config.validate()?;

    let sampler = WeightedSampler::new(config.distribution, config.length_1)?;
    let a = sampler.sample(rng, config.length_1);

    let b = match config.strategy {
        Strategy::Independent => sampler.sample(rng, config.length_1),
        Strategy::Remove => remove(rng, &a, config.change_strength, config.chunkiness)?,
        Strategy::Add => add(rng, &sampler, &a, config.change_strength, config.chunkiness)?,
        Strategy::AddRemove => {
            let grown = add(rng, &sampler, &a, config.change_strength, config.chunkiness)?;
            remove(
                rng,
                &grown,
                addremove_removal_strength(config.change_strength),
                config.chunkiness,
            )?
        }
    };

    Ok(EditPair { a, b })
}

fn remove<R: Rng + ?Sized>(
    rng: &mut R,
    values: &[u32],
    strength: f64,
    chunkiness: f64,
) -> Result<Sequence, GenError> {
    let mask = build_chunky_mask(rng, values.len(), strength, chunkiness)?;
    Ok(values
        .iter()
        .zip(mask)
        .filter(|(_, removed)| !removed)
        .map(|(&v, _)| v)
        .collect())
}

fn add<R: Rng + ?Sized>(
    rng: &mut R,
    sampler: &WeightedSampler,
    values: &[u32],
    strength: f64,
    chunkiness: f64,
) -> Result<Sequence, GenError> {
    let addition_count = (values.len() as f64 * strength).floor() as usize;
    let additions = sampler.sample(rng, addition_count);
    merge(rng, values, &additions, chunkiness)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Distribution;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn config(strategy: Strategy, length_1: usize, change_strength: f64) -> GenerationConfig {
        GenerationConfig {
            strategy,
            length_1,
            change_strength,
            chunkiness: 0.0,
            distribution: Distribution::Zipf,
        }
    }

    fn is_subsequence(needle: &[u32], haystack: &[u32]) -> bool {
        let mut it = haystack.iter();
        needle.iter().all(|n| it.any(|h| h == n))
    }

    #[test]
    fn test_independent_lengths() {
        let mut rng = StdRng::seed_from_u64(31);
        let pair = generate(&mut rng, &GenerationConfig::independent(40, Distribution::Uniform)).unwrap();
        assert_eq!(pair.a.len(), 40);
        assert_eq!(pair.b.len(), 40);
    }

    #[test]
    fn test_remove_yields_subsequence() {
        let mut rng = StdRng::seed_from_u64(32);
        let pair = generate(&mut rng, &config(Strategy::Remove, 200, 0.4)).unwrap();
        assert!(pair.b.len() < pair.a.len());
        assert!(is_subsequence(&pair.b, &pair.a));
    }

    #[test]
    fn test_remove_length_tracks_strength() {
        let trials = 200;
        let total: usize = (0..trials)
            .map(|seed| {
                let mut rng = StdRng::seed_from_u64(seed);
                generate(&mut rng, &config(Strategy::Remove, 100, 0.3)).unwrap().b.len()
            })
            .sum();
        let mean = total as f64 / trials as f64;
        assert!((mean - 70.0).abs() < 2.0, "mean remaining length {}", mean);
    }

    #[test]
    fn test_add_inserts_exact_count() {
        let mut rng = StdRng::seed_from_u64(33);
        let pair = generate(&mut rng, &config(Strategy::Add, 100, 0.25)).unwrap();
        assert_eq!(pair.b.len(), 125);
        assert!(is_subsequence(&pair.a, &pair.b));
    }

    #[test]
    fn test_addremove_keeps_length_near_original() {
        let trials = 100;
        let total: usize = (0..trials)
            .map(|seed| {
                let mut rng = StdRng::seed_from_u64(seed);
                let mut cfg = config(Strategy::AddRemove, 200, 0.5);
                cfg.chunkiness = 0.5;
                generate(&mut rng, &cfg).unwrap().b.len()
            })
            .sum();
        let mean = total as f64 / trials as f64;
        assert!((mean - 200.0).abs() < 10.0, "mean final length {}", mean);
    }

    #[test]
    fn test_removal_strength_formula() {
        assert!((addremove_removal_strength(1.0) - 0.5).abs() < 1e-12);
        assert!((addremove_removal_strength(0.25) - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut rng = StdRng::seed_from_u64(34);
        let mut cfg = GenerationConfig::independent(10, Distribution::Zipf);
        cfg.change_strength = 0.5;
        assert!(matches!(
            generate(&mut rng, &cfg),
            Err(GenError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_same_seed_same_pair() {
        let mut cfg = config(Strategy::AddRemove, 50, 0.2);
        cfg.chunkiness = 0.5;
        let first = generate(&mut StdRng::seed_from_u64(99), &cfg).unwrap();
        let second = generate(&mut StdRng::seed_from_u64(99), &cfg).unwrap();
        assert_eq!(first, second);
    }
}
