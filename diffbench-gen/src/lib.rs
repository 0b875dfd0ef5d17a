#![warn(missing_docs)]
//! diffbench Generator
//!
//! Produces pairs of integer sequences `(A, B)` where `B` is derived from `A`
//! by a controllable edit strategy:
//! - `independent`: unrelated sequences (worst case for a diff)
//! - `add`: freshly sampled symbols merged into `A`
//! - `remove`: a chunky mask of `A` deleted
//! - `addremove`: `add` followed by a compensating `remove`
//!
//! Change strength sets how many elements are touched, chunkiness sets how
//! strongly the touched elements cluster into contiguous runs. Every call
//! takes an explicit random source, so any pair can be replayed from a seed.
//!
//! Pairs are persisted as `in_1.txt` / `in_2.txt`, one integer per line, the
//! format the benchmarked diff programs read.

mod config;
mod error;
mod mask;
mod merge;
mod pair;
mod partition;
mod sampler;
mod script;
mod testcase;

pub use config::{Distribution, GenerationConfig, Strategy};
pub use error::GenError;
pub use mask::{build_chunky_mask, count_runs, dampen_chunkiness};
pub use merge::{effective_merge_chunkiness, merge};
pub use pair::{EditPair, addremove_removal_strength, generate};
pub use partition::partition;
pub use sampler::{WeightedSampler, sample};
pub use script::{EditOp, apply_edit_script, read_edit_script};
pub use testcase::{
    FIRST_INPUT, SECOND_INPUT, TestCasePaths, derive_seed, read_sequence, read_test_case,
    write_sequence, write_test_case,
};

/// Ordered list of opaque integer symbols (stand-ins for lines of text)
pub type Sequence = Vec<u32>;

/// Generate the pair for `config` from a fixed seed.
pub fn generate_seeded(config: &GenerationConfig, seed: u64) -> Result<EditPair, GenError> {
    use rand::SeedableRng;
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    generate(&mut rng, config)
}
