//! Chunky Selection Masks
//!
//! Builds a boolean mask whose number of selected positions is fixed by an
//! independent Bernoulli draw, and whose shape (few long runs versus many
//! singletons) is controlled by chunkiness alone.
//!
//! Placement walks the positions once. The Bernoulli draw marks eligible
//! slots; each run claims a window holding exactly as many eligible slots as
//! its length, extended over the free span up to the next eligible slot. The
//! run is then dropped at a random offset inside its window. Windows are
//! disjoint, so runs never overlap and the selected count is exactly the
//! number of eligible slots.

use crate::error::GenError;
use crate::partition::partition;
use rand::Rng;
use std::ops::Range;

/// Chunkiness after bounding it by the available selection density.
///
/// `min(c, sqrt(c^2 + d^2) / sqrt(2))`. The formula is an empirical
/// heuristic and is kept as-is.
pub fn dampen_chunkiness(chunkiness: f64, density: f64) -> f64 {
    chunkiness.min((chunkiness * chunkiness + density * density).sqrt() / std::f64::consts::SQRT_2)
}

/// Build a mask over `size` positions with `target_density` selected and
/// clustering controlled by `chunkiness`.
pub fn build_chunky_mask<R: Rng + ?Sized>(
    rng: &mut R,
    size: usize,
    target_density: f64,
    chunkiness: f64,
) -> Result<Vec<bool>, GenError> {
    if !(0.0..=1.0).contains(&target_density) {
        return Err(GenError::invalid(format!(
            "mask density must be in [0, 1], got {}",
            target_density
        )));
    }
    if !(0.0..=1.0).contains(&chunkiness) {
        return Err(GenError::invalid(format!(
            "chunkiness must be in [0, 1], got {}",
            chunkiness
        )));
    }

    // Count comes from this draw only; chunkiness never touches it.
    let eligible: Vec<bool> = (0..size).map(|_| rng.gen::<f64>() < target_density).collect();
    let base_count = eligible.iter().filter(|&&e| e).count();

    let mut mask = vec![false; size];
    if base_count == 0 {
        return Ok(mask);
    }

    let dampened = dampen_chunkiness(chunkiness, target_density);
    let chunk_count = chunk_count(base_count, dampened);
    let runs = partition(rng, base_count, chunk_count)?;

    for (window, run) in placement_windows(&eligible, &runs) {
        let wiggle = window.len() - run;
        let start = window.start + rng.gen_range(0..=wiggle);
        mask[start..start + run].fill(true);
    }

    Ok(mask)
}

/// `floor(count ^ (1 - chunkiness))`, kept within `1..=count`.
pub(crate) fn chunk_count(count: usize, chunkiness: f64) -> usize {
    ((count as f64).powf(1.0 - chunkiness).floor() as usize).clamp(1, count)
}

/// Pair each run with the window it may occupy.
fn placement_windows(eligible: &[bool], runs: &[usize]) -> Vec<(Range<usize>, usize)> {
    let mut windows = Vec::with_capacity(runs.len());
    let mut pending = runs.iter().copied().peekable();
    let mut window_start = 0;
    let mut capacity = 0;
    let mut pos = 0;

    while pos < eligible.len() {
        let Some(&need) = pending.peek() else {
            break;
        };

        if eligible[pos] {
            capacity += 1;
            if capacity == need {
                pending.next();
                let mut end = pos + 1;
                if pending.peek().is_none() {
                    end = eligible.len();
                } else {
                    while end < eligible.len() && !eligible[end] {
                        end += 1;
                    }
                }
                windows.push((window_start..end, need));
                window_start = end;
                capacity = 0;
                pos = end;
                continue;
            }
        }
        pos += 1;
    }

    windows
}

/// Number of maximal runs of `true` in a mask.
pub fn count_runs(mask: &[bool]) -> usize {
    let mut runs = 0;
    let mut previous = false;
    for &selected in mask {
        if selected && !previous {
            runs += 1;
        }
        previous = selected;
    }
    runs
}
