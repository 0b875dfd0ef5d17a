//! Property-based tests for the edit-pair generator.
//!
//! Verifies:
//! - Partition sizes are positive and sum to the total
//! - Mask selected count does not depend on chunkiness
//! - Merging preserves length and the order of both inputs
//! - Same seed reproduces the same pair

use diffbench_gen::{
    Distribution, GenerationConfig, Strategy as EditStrategy, build_chunky_mask, generate_seeded,
    merge, partition,
};
use proptest::collection::vec as arb_vec;
use proptest::prelude::*;
use rand::SeedableRng;
use rand::rngs::StdRng;

fn arb_strategy() -> impl Strategy<Value = EditStrategy> {
    prop_oneof![
        Just(EditStrategy::Add),
        Just(EditStrategy::Remove),
        Just(EditStrategy::AddRemove),
    ]
}

fn arb_distribution() -> impl Strategy<Value = Distribution> {
    prop_oneof![Just(Distribution::Uniform), Just(Distribution::Zipf)]
}

proptest! {
    #[test]
    fn partition_sums_to_total(total in 1usize..500, parts_seed in any::<usize>(), seed in any::<u64>()) {
        let num_parts = 1 + parts_seed % total;
        let mut rng = StdRng::seed_from_u64(seed);
        let sizes = partition(&mut rng, total, num_parts).unwrap();
        prop_assert_eq!(sizes.len(), num_parts);
        prop_assert!(sizes.iter().all(|&s| s >= 1));
        prop_assert_eq!(sizes.iter().sum::<usize>(), total);
    }

    #[test]
    fn mask_count_ignores_chunkiness(
        size in 0usize..400,
        density in 0.01f64..0.99,
        c1 in 0.0f64..=1.0,
        c2 in 0.0f64..=1.0,
        seed in any::<u64>(),
    ) {
        let count = |c: f64| {
            let mut rng = StdRng::seed_from_u64(seed);
            let mask = build_chunky_mask(&mut rng, size, density, c).unwrap();
            assert_eq!(mask.len(), size);
            mask.iter().filter(|&&m| m).count()
        };
        prop_assert_eq!(count(c1), count(c2));
    }

    #[test]
    fn merge_preserves_both_orders(
        a in arb_vec(0u32..1000, 0..200),
        b in arb_vec(0u32..1000, 0..200),
        chunkiness in 0.0f64..=1.0,
        seed in any::<u64>(),
    ) {
        // Tag each element with its side so equal symbols stay distinguishable.
        let left: Vec<(bool, usize, u32)> = a.iter().enumerate().map(|(i, &v)| (true, i, v)).collect();
        let right: Vec<(bool, usize, u32)> = b.iter().enumerate().map(|(i, &v)| (false, i, v)).collect();
        let mut rng = StdRng::seed_from_u64(seed);
        let merged = merge(&mut rng, &left, &right, chunkiness).unwrap();

        prop_assert_eq!(merged.len(), a.len() + b.len());
        let from_left: Vec<_> = merged.iter().copied().filter(|t| t.0).collect();
        let from_right: Vec<_> = merged.iter().copied().filter(|t| !t.0).collect();
        prop_assert_eq!(from_left, left);
        prop_assert_eq!(from_right, right);
    }

    #[test]
    fn same_seed_same_pair(
        strategy in arb_strategy(),
        distribution in arb_distribution(),
        length_1 in 1usize..300,
        change_strength in 0.01f64..=1.0,
        chunkiness in 0.0f64..=1.0,
        seed in any::<u64>(),
    ) {
        let config = GenerationConfig { strategy, length_1, change_strength, chunkiness, distribution };
        let first = generate_seeded(&config, seed).unwrap();
        let second = generate_seeded(&config, seed).unwrap();
        prop_assert_eq!(first.a.len(), length_1);
        prop_assert_eq!(first, second);
    }
}
