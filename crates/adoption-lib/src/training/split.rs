//! Stratified partitioning of labeled data

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Row indices of each partition, ascending within a partition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub validation: Vec<usize>,
    pub test: Vec<usize>,
}

/// Split row indices into train/validation/test, preserving class ratios
///
/// Each class is shuffled with a seeded RNG and cut independently. A class
/// with at least three members always contributes one row to validation and
/// one to test; smaller classes stay in train first.
pub fn stratified_split(
    labels: &[u8],
    validation_fraction: f64,
    test_fraction: f64,
    seed: u64,
) -> SplitIndices {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut split = SplitIndices {
        train: Vec::new(),
        validation: Vec::new(),
        test: Vec::new(),
    };

    for (_, mut indices) in group_by_label(labels) {
        indices.shuffle(&mut rng);
        let (n_val, n_test) = holdout_sizes(indices.len(), validation_fraction, test_fraction);
        split.validation.extend_from_slice(&indices[..n_val]);
        split.test.extend_from_slice(&indices[n_val..n_val + n_test]);
        split.train.extend_from_slice(&indices[n_val + n_test..]);
    }

    split.train.sort_unstable();
    split.validation.sort_unstable();
    split.test.sort_unstable();
    split
}

/// Assign each position to one of `k` folds, round-robin within each class
pub fn stratified_folds(labels: &[u8], k: usize) -> Vec<usize> {
    let mut folds = vec![0; labels.len()];
    if k == 0 {
        return folds;
    }
    for (_, indices) in group_by_label(labels) {
        for (j, idx) in indices.into_iter().enumerate() {
            folds[idx] = j % k;
        }
    }
    folds
}

fn group_by_label(labels: &[u8]) -> BTreeMap<u8, Vec<usize>> {
    let mut groups: BTreeMap<u8, Vec<usize>> = BTreeMap::new();
    for (i, label) in labels.iter().enumerate() {
        groups.entry(*label).or_default().push(i);
    }
    groups
}

fn holdout_sizes(n: usize, validation_fraction: f64, test_fraction: f64) -> (usize, usize) {
    match n {
        0 | 1 => (0, 0),
        2 => (1, 0),
        _ => {
            let n_val = ((n as f64 * validation_fraction).round() as usize).max(1);
            let n_test = ((n as f64 * test_fraction).round() as usize).max(1);
            if n_val + n_test >= n {
                (1, 1)
            } else {
                (n_val, n_test)
            }
        }
    }
}
