//! Train/test partitioning of a [`FeatureTable`].

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::debug;

use crate::error::{LearnError, Result};
use crate::features::FeatureTable;

/// Seed used by the standard evaluation run.
pub const DEFAULT_SEED: u64 = 42;

/// Share of rows held out for testing in the standard evaluation run.
pub const DEFAULT_TEST_FRACTION: f64 = 0.25;

/// Disjoint train and test tables.
#[derive(Debug, Clone, PartialEq)]
pub struct Split {
    pub train: FeatureTable,
    pub test: FeatureTable,
}

impl Split {
    fn from_indices(table: &FeatureTable, mut train: Vec<usize>, mut test: Vec<usize>) -> Result<Self> {
        if train.is_empty() {
            return Err(LearnError::EmptySplit("train"));
        }
        if test.is_empty() {
            return Err(LearnError::EmptySplit("test"));
        }
        // Both sides keep the table's row order.
        train.sort_unstable();
        test.sort_unstable();
        Ok(Self {
            train: table.take(&train),
            test: table.take(&test),
        })
    }
}

/// Randomly hold out `test_fraction` of the rows, reproducibly for a given
/// `seed`.
///
/// With `stratify`, every label is split on its own so that each keeps its
/// share in both halves; a label's test count is its size times
/// `test_fraction`, rounded. Without it, `ceil(n * test_fraction)` rows go
/// to the test side.
pub fn train_test_split(table: &FeatureTable, test_fraction: f64, seed: u64, stratify: bool) -> Result<Split> {
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(LearnError::InvalidTestFraction(test_fraction));
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut train = Vec::new();
    let mut test = Vec::new();

    if stratify {
        let mut by_label: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
        for (i, label) in table.labels().iter().enumerate() {
            by_label.entry(label.as_str()).or_default().push(i);
        }
        for (label, mut indices) in by_label {
            indices.shuffle(&mut rng);
            let n_test = (indices.len() as f64 * test_fraction).round() as usize;
            debug!("Label {}: {} test / {} train", label, n_test, indices.len() - n_test);
            test.extend_from_slice(&indices[..n_test]);
            train.extend_from_slice(&indices[n_test..]);
        }
    } else {
        let mut indices: Vec<usize> = (0..table.len()).collect();
        indices.shuffle(&mut rng);
        let n_test = (indices.len() as f64 * test_fraction).ceil() as usize;
        test.extend_from_slice(&indices[..n_test]);
        train.extend_from_slice(&indices[n_test..]);
    }

    Split::from_indices(table, train, test)
}

/// Hold out every row of `participant` as the test set.
pub fn participant_split(table: &FeatureTable, participant: &str) -> Result<Split> {
    let (test, train): (Vec<usize>, Vec<usize>) =
        (0..table.len()).partition(|&i| table.participants()[i] == participant);

    if test.is_empty() {
        return Err(LearnError::UnknownParticipant(participant.to_string()));
    }
    Split::from_indices(table, train, test)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
