//! The classifier contract the evaluation harness drives.
//!
//! Implementations wrap whatever model library is at hand; the harness only
//! needs predictions and class probabilities back.

use tracing::debug;

use crate::error::{LearnError, Result};
use crate::features::FeatureMatrix;
use crate::metrics::accuracy_score;

/// Per-row class probabilities; `classes` names the columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassProbabilities {
    pub classes: Vec<String>,
    pub rows: Vec<Vec<f64>>,
}

/// Everything one classifier run returns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassifierOutput {
    pub train_predictions: Vec<String>,
    pub test_predictions: Vec<String>,
    pub train_probabilities: ClassProbabilities,
    pub test_probabilities: ClassProbabilities,
}

/// Result of greedy forward feature selection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ForwardSelection {
    /// Features in the order they were added.
    pub selected: Vec<String>,
    /// Training accuracy after each addition.
    pub scores: Vec<f64>,
}

/// A family of classifiers trained on `x_train`/`y_train` and applied to
/// both `x_train` and `x_test`.
///
/// `gridsearch` asks the implementation to tune its hyperparameters before
/// the final fit; implementations without tuning may ignore it.
pub trait Learner {
    fn feedforward_neural_network(
        &mut self,
        x_train: &FeatureMatrix,
        y_train: &[String],
        x_test: &FeatureMatrix,
        gridsearch: bool,
    ) -> Result<ClassifierOutput>;

    fn random_forest(
        &mut self,
        x_train: &FeatureMatrix,
        y_train: &[String],
        x_test: &FeatureMatrix,
        gridsearch: bool,
    ) -> Result<ClassifierOutput>;

    fn k_nearest_neighbor(
        &mut self,
        x_train: &FeatureMatrix,
        y_train: &[String],
        x_test: &FeatureMatrix,
        gridsearch: bool,
    ) -> Result<ClassifierOutput>;

    fn decision_tree(
        &mut self,
        x_train: &FeatureMatrix,
        y_train: &[String],
        x_test: &FeatureMatrix,
        gridsearch: bool,
    ) -> Result<ClassifierOutput>;

    fn naive_bayes(
        &mut self,
        x_train: &FeatureMatrix,
        y_train: &[String],
        x_test: &FeatureMatrix,
        gridsearch: bool,
    ) -> Result<ClassifierOutput>;

    /// Greedily pick up to `max_features` columns of `x`.
    ///
    /// Each round fits an untuned decision tree for every remaining
    /// candidate and keeps the one with the best training accuracy. Ties go
    /// to the earlier column.
    fn forward_selection(
        &mut self,
        max_features: usize,
        x: &FeatureMatrix,
        y: &[String],
    ) -> Result<ForwardSelection> {
        if y.len() != x.len() {
            return Err(LearnError::LengthMismatch {
                expected: x.len(),
                actual: y.len(),
            });
        }

        let mut selection = ForwardSelection::default();

        for _ in 0..max_features.min(x.n_features()) {
            let mut best: Option<(&String, f64)> = None;

            for candidate in x.names() {
                if selection.selected.contains(candidate) {
                    continue;
                }
                let mut trial = selection.selected.clone();
                trial.push(candidate.clone());
                let subset = x.select(&trial)?;

                let output = self.decision_tree(&subset, y, &subset, false)?;
                let accuracy = accuracy_score(y, &output.train_predictions)?;

                if best.map_or(true, |(_, score)| accuracy > score) {
                    best = Some((candidate, accuracy));
                }
            }

            let Some((feature, score)) = best else {
                break;
            };
            debug!("Forward selection added {} (accuracy {:.4})", feature, score);
            selection.selected.push(feature.clone());
            selection.scores.push(score);
        }

        Ok(selection)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
