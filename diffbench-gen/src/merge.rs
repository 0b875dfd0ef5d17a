//! Chunky Sequence Merging
//!
//! Interleaves two sequences while preserving the internal order of each.
//! Both sides are cut into contiguous runs and the runs alternate, so the
//! number of runs (and with it how chunky the result is) follows the
//! chunkiness parameter.

use crate::error::GenError;
use crate::mask::chunk_count;
use crate::partition::split_runs;
use rand::Rng;

/// Map user chunkiness into the range the merger actually uses.
///
/// `0.1 + 0.7 * c` keeps both extremes away from degenerate output. Empirical
/// heuristic, kept as-is.
pub fn effective_merge_chunkiness(chunkiness: f64) -> f64 {
    0.1 + 0.7 * chunkiness
}

/// Merge `a` and `b` into one sequence of length `a.len() + b.len()`.
///
/// Which side opens and which side closes the output are drawn separately,
/// weighted by length. With a single run per side (the shorter side has one
/// element) the closing draw cannot be honoured: the output is the opening
/// side followed by the other side.
pub fn merge<R: Rng + ?Sized, T: Clone>(
    rng: &mut R,
    a: &[T],
    b: &[T],
    chunkiness: f64,
) -> Result<Vec<T>, GenError> {
    if !(0.0..=1.0).contains(&chunkiness) {
        return Err(GenError::invalid(format!(
            "chunkiness must be in [0, 1], got {}",
            chunkiness
        )));
    }

    let total = a.len() + b.len();
    if a.is_empty() || b.is_empty() {
        return Ok(a.iter().chain(b).cloned().collect());
    }

    let share_a = a.len() as f64 / total as f64;
    let starts_with_a = rng.gen_bool(share_a);
    let ends_with_a = rng.gen_bool(share_a);

    let (first, second) = if starts_with_a { (a, b) } else { (b, a) };

    let runs = chunk_count(a.len().min(b.len()), effective_merge_chunkiness(chunkiness));
    // A single run per side always ends with the second side.
    let ends_with_first = starts_with_a == ends_with_a && runs > 1;
    let first_runs = split_runs(rng, first, runs)?;
    // One run less on the other side when the same side closes the output
    let second_count = if ends_with_first { runs - 1 } else { runs };
    let second_runs = split_runs(rng, second, second_count)?;

    let mut merged = Vec::with_capacity(total);
    for i in 0..first_runs.len().max(second_runs.len()) {
        if let Some(run) = first_runs.get(i) {
            merged.extend_from_slice(run);
        }
        if let Some(run) = second_runs.get(i) {
            merged.extend_from_slice(run);
        }
    }

    Ok(merged)
}
