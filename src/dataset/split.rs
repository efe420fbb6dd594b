//! Deterministic train/test partitioning

use super::Dataset;
use crate::error::{KolosalError, Result};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// A disjoint partition of row indices into training and held-out sets.
/// `test_fraction` and `seed` are part of its identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Split {
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
    pub test_fraction: f64,
    pub seed: u64,
}

impl Split {
    pub fn n_train(&self) -> usize {
        self.train_indices.len()
    }

    pub fn n_test(&self) -> usize {
        self.test_indices.len()
    }
}

/// Partition `dataset` rows. Same inputs always yield the same partition.
pub fn split(dataset: &Dataset, test_fraction: f64, seed: u64) -> Result<Split> {
    split_indices(dataset.n_rows(), test_fraction, seed)
}

/// Partition `0..n_rows`. The held-out size is `ceil(test_fraction * n_rows)`.
pub fn split_indices(n_rows: usize, test_fraction: f64, seed: u64) -> Result<Split> {
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(KolosalError::ConfigError(format!(
            "test_fraction must be in (0, 1), got {}",
            test_fraction
        )));
    }

    let n_test = (test_fraction * n_rows as f64).ceil() as usize;
    if n_test == 0 || n_test >= n_rows {
        return Err(KolosalError::ConfigError(format!(
            "test_fraction {} leaves an empty partition for {} rows",
            test_fraction, n_rows
        )));
    }

    let mut indices: Vec<usize> = (0..n_rows).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let mut test_indices = indices[..n_test].to_vec();
    let mut train_indices = indices[n_test..].to_vec();
    test_indices.sort_unstable();
    train_indices.sort_unstable();

    Ok(Split {
        train_indices,
        test_indices,
        test_fraction,
        seed,
    })
}
