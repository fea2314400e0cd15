//! Classification metrics.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::error::{LearnError, Result};

fn check_lengths<T, U>(truth: &[T], predicted: &[U]) -> Result<()> {
    if truth.len() != predicted.len() {
        return Err(LearnError::LengthMismatch {
            expected: truth.len(),
            actual: predicted.len(),
        });
    }
    if truth.is_empty() {
        return Err(LearnError::EmptySplit("evaluation"));
    }
    Ok(())
}

/// Fraction of positions where `predicted` equals `truth`.
pub fn accuracy_score<T: PartialEq>(truth: &[T], predicted: &[T]) -> Result<f64> {
    check_lengths(truth, predicted)?;
    let correct = truth.iter().zip(predicted).filter(|(t, p)| t == p).count();
    Ok(correct as f64 / truth.len() as f64)
}

// ── ConfusionMatrix ───────────────────────────────────────────────────────────

/// Counts of (true label, predicted label) pairs.
///
/// Rows are true labels and columns predicted labels, both in `labels`
/// order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfusionMatrix {
    labels: Vec<String>,
    counts: Vec<Vec<usize>>,
}

impl ConfusionMatrix {
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn counts(&self) -> &[Vec<usize>] {
        &self.counts
    }

    fn index_of(&self, label: &str) -> Option<usize> {
        self.labels.iter().position(|l| l == label)
    }

    /// How often `truth` was predicted as `predicted`; 0 for unknown labels.
    pub fn get(&self, truth: &str, predicted: &str) -> usize {
        match (self.index_of(truth), self.index_of(predicted)) {
            (Some(t), Some(p)) => self.counts[t][p],
            _ => 0,
        }
    }

    /// Number of pairs counted.
    pub fn total(&self) -> usize {
        self.counts.iter().flatten().sum()
    }

    /// Sum of the diagonal.
    pub fn correct(&self) -> usize {
        (0..self.labels.len()).map(|i| self.counts[i][i]).sum()
    }

    /// Largest cell value.
    pub fn max(&self) -> usize {
        self.counts.iter().flatten().copied().max().unwrap_or(0)
    }
}

/// Build a confusion matrix over `labels`.
///
/// When `labels` is `None` the sorted union of both sequences is used.
/// Pairs involving a label outside `labels` are not counted.
pub fn confusion_matrix<S: AsRef<str>>(
    truth: &[S],
    predicted: &[S],
    labels: Option<&[String]>,
) -> Result<ConfusionMatrix> {
    check_lengths(truth, predicted)?;

    let labels: Vec<String> = match labels {
        Some(labels) => labels.to_vec(),
        None => truth
            .iter()
            .chain(predicted)
            .map(|s| s.as_ref().to_string())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect(),
    };

    let mut matrix = ConfusionMatrix {
        counts: vec![vec![0; labels.len()]; labels.len()],
        labels,
    };
    for (t, p) in truth.iter().zip(predicted) {
        if let (Some(t), Some(p)) = (matrix.index_of(t.as_ref()), matrix.index_of(p.as_ref())) {
            matrix.counts[t][p] += 1;
        }
    }
    Ok(matrix)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
