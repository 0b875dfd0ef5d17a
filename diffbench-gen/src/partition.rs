//! Random Compositions
//!
//! Splits a count into positive parts by picking distinct cut points
//! (stars and bars), which yields a uniformly random composition.

use crate::error::GenError;
use rand::Rng;

/// Split `total` into `num_parts` positive sizes that sum to `total`.
///
/// Requires `1 <= num_parts <= total`.
pub fn partition<R: Rng + ?Sized>(
    rng: &mut R,
    total: usize,
    num_parts: usize,
) -> Result<Vec<usize>, GenError> {
    if num_parts == 0 || num_parts > total {
        return Err(GenError::invalid(format!(
            "cannot split {} into {} positive parts",
            total, num_parts
        )));
    }

    let mut bounds = rand::seq::index::sample(rng, total, num_parts).into_vec();
    bounds.push(total);
    bounds.sort_unstable();
    bounds[0] = 0;

    Ok(bounds.windows(2).map(|w| w[1] - w[0]).collect())
}

/// Split `items` into `num_parts` contiguous, non-empty runs.
pub(crate) fn split_runs<'a, R: Rng + ?Sized, T>(
    rng: &mut R,
    items: &'a [T],
    num_parts: usize,
) -> Result<Vec<&'a [T]>, GenError> {
    let sizes = partition(rng, items.len(), num_parts)?;
    let mut runs = Vec::with_capacity(sizes.len());
    let mut rest = items;
    for size in sizes {
        let (run, tail) = rest.split_at(size);
        runs.push(run);
        rest = tail;
    }
    Ok(runs)
}
