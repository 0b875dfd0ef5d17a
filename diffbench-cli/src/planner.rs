//! Generation Grid Planner
//!
//! Crosses file sizes, change strengths, chunkiness levels and strategies
//! into the list of generation configs a run measures.
//!
//! - File sizes: geometrically spaced, floored, de-duplicated
//! - Change strengths: evenly spaced in (0, 1]
//! - Chunkiness: evenly spaced in [0, 1]
//! - `independent` has no edits to control, so it is kept only at
//!   change strength 1 and chunkiness 0
//!
//! Ordering: the grid is shuffled with the run's seed so slow cells are spread
//! over the run; every config keeps its index in the unshuffled grid.

use crate::config::GenerationSection;
use diffbench_gen::{GenerationConfig, Strategy};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

/// A generation config and its index in the unshuffled grid
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlannedConfig {
    pub index: usize,
    pub config: GenerationConfig,
}

/// Ordered list of generation configs to run
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationPlan {
    /// Configs in execution order
    pub configs: Vec<PlannedConfig>,
}

/// `steps` lengths spaced geometrically between `min` and `max`.
pub fn file_sizes(min: usize, max: usize, steps: usize) -> Vec<usize> {
    if steps <= 1 || min == max {
        return vec![min];
    }
    let ratio = max as f64 / min as f64;
    let mut sizes: Vec<usize> = (0..steps)
        .map(|i| {
            if i == steps - 1 {
                max
            } else {
                let t = i as f64 / (steps - 1) as f64;
                // Absorb powf rounding just below an integer
                ((min as f64 * ratio.powf(t) + 1e-9).floor() as usize).clamp(min, max)
            }
        })
        .collect();
    sizes.sort_unstable();
    sizes.dedup();
    sizes
}

/// `steps` change strengths `1/steps, 2/steps, ..., 1`.
pub fn change_strengths(steps: usize) -> Vec<f64> {
    (1..=steps).map(|i| i as f64 / steps as f64).collect()
}

/// `steps` chunkiness levels from 0 to 1 inclusive.
pub fn chunkiness_levels(steps: usize) -> Vec<f64> {
    match steps {
        0 => Vec::new(),
        1 => vec![0.0],
        _ => (0..steps).map(|i| i as f64 / (steps - 1) as f64).collect(),
    }
}

/// Full grid in its unshuffled order: size, change strength, chunkiness, strategy.
pub fn build_grid(section: &GenerationSection) -> Vec<GenerationConfig> {
    let sizes = file_sizes(
        section.min_file_size,
        section.max_file_size,
        section.file_size_steps,
    );
    let strengths = change_strengths(section.change_strength_steps);
    let chunkiness = chunkiness_levels(section.chunkiness_steps);

    let mut grid = Vec::new();
    for &length_1 in &sizes {
        for &change_strength in &strengths {
            for &chunk in &chunkiness {
                for &strategy in &section.strategies {
                    if strategy == Strategy::Independent
                        && (change_strength != 1.0 || chunk != 0.0)
                    {
                        continue;
                    }
                    grid.push(GenerationConfig {
                        strategy,
                        length_1,
                        change_strength,
                        chunkiness: chunk,
                        distribution: section.distribution,
                    });
                }
            }
        }
    }
    grid
}

/// Build the shuffled plan for `section` under `seed`.
pub fn build_plan(section: &GenerationSection, seed: u64) -> GenerationPlan {
    let mut configs: Vec<PlannedConfig> = build_grid(section)
        .into_iter()
        .enumerate()
        .map(|(index, config)| PlannedConfig { index, config })
        .collect();

    let mut rng = StdRng::seed_from_u64(seed);
    configs.shuffle(&mut rng);

    GenerationPlan { configs }
}

#[cfg(test)]
mod tests {
    use super::*;
    use diffbench_gen::Distribution;

    fn section() -> GenerationSection {
        GenerationSection {
            min_file_size: 1,
            max_file_size: 1000,
            file_size_steps: 4,
            change_strength_steps: 2,
            chunkiness_steps: 3,
            strategies: Strategy::ALL.to_vec(),
            distribution: Distribution::Uniform,
            num_regens: 1,
            seed: None,
        }
    }

    #[test]
    fn test_file_sizes_geometric() {
        assert_eq!(file_sizes(1, 1000, 4), vec![1, 10, 100, 1000]);
        assert_eq!(file_sizes(5, 5, 3), vec![5]);
        assert_eq!(file_sizes(1, 5000, 1), vec![1]);
        // Small ranges collapse after flooring
        assert_eq!(file_sizes(1, 3, 10), vec![1, 2, 3]);
    }

    #[test]
    fn test_levels() {
        assert_eq!(change_strengths(4), vec![0.25, 0.5, 0.75, 1.0]);
        assert_eq!(chunkiness_levels(3), vec![0.0, 0.5, 1.0]);
        assert_eq!(chunkiness_levels(1), vec![0.0]);
    }

    #[test]
    fn test_grid_keeps_single_independent_per_size() {
        let grid = build_grid(&section());
        let independent: Vec<_> = grid
            .iter()
            .filter(|c| c.strategy == Strategy::Independent)
            .collect();
        assert_eq!(independent.len(), 4);
        assert!(
            independent
                .iter()
                .all(|c| c.change_strength == 1.0 && c.chunkiness == 0.0)
        );
        // 4 sizes * 2 strengths * 3 chunkiness * 3 edit strategies + 4 independent
        assert_eq!(grid.len(), 4 * 2 * 3 * 3 + 4);
        assert!(grid.iter().all(|c| c.validate().is_ok()));
    }

    #[test]
    fn test_plan_is_seeded_permutation() {
        let a = build_plan(&section(), 11);
        let b = build_plan(&section(), 11);
        assert_eq!(a, b);

        let mut indices: Vec<usize> = a.configs.iter().map(|p| p.index).collect();
        indices.sort_unstable();
        assert_eq!(indices, (0..a.configs.len()).collect::<Vec<_>>());

        let grid = build_grid(&section());
        for planned in &a.configs {
            assert_eq!(grid[planned.index], planned.config);
        }
    }
}
