//! Model comparison across feature sets.

use std::fmt;

use serde::Serialize;
use tracing::{debug, info};

use crate::error::{LearnError, Result};
use crate::features::{FeatureSets, FeatureTable};
use crate::learner::{ClassifierOutput, Learner};
use crate::metrics::{accuracy_score, confusion_matrix, ConfusionMatrix};

// ── ModelKind ─────────────────────────────────────────────────────────────────

/// The classifier families of a [`Learner`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ModelKind {
    #[serde(rename = "NN")]
    NeuralNetwork,
    #[serde(rename = "RF")]
    RandomForest,
    #[serde(rename = "KNN")]
    KNearestNeighbor,
    #[serde(rename = "DT")]
    DecisionTree,
    #[serde(rename = "NB")]
    NaiveBayes,
}

impl ModelKind {
    pub const ALL: [ModelKind; 5] = [
        ModelKind::NeuralNetwork,
        ModelKind::RandomForest,
        ModelKind::KNearestNeighbor,
        ModelKind::DecisionTree,
        ModelKind::NaiveBayes,
    ];

    pub fn abbreviation(self) -> &'static str {
        match self {
            ModelKind::NeuralNetwork => "NN",
            ModelKind::RandomForest => "RF",
            ModelKind::KNearestNeighbor => "KNN",
            ModelKind::DecisionTree => "DT",
            ModelKind::NaiveBayes => "NB",
        }
    }

    /// Whether repeated fits can give different predictions.
    pub fn is_stochastic(self) -> bool {
        matches!(self, ModelKind::NeuralNetwork | ModelKind::RandomForest)
    }

    /// Whether the comparison run tunes this family.
    pub fn gridsearch(self) -> bool {
        matches!(
            self,
            ModelKind::RandomForest | ModelKind::KNearestNeighbor | ModelKind::DecisionTree
        )
    }

    /// Dispatch one fit to the matching [`Learner`] method.
    pub fn run<L: Learner + ?Sized>(
        self,
        learner: &mut L,
        train: &FeatureTable,
        test: &FeatureTable,
        gridsearch: bool,
    ) -> Result<ClassifierOutput> {
        let (x_train, y_train, x_test) = (train.features(), train.labels(), test.features());
        match self {
            ModelKind::NeuralNetwork => learner.feedforward_neural_network(x_train, y_train, x_test, gridsearch),
            ModelKind::RandomForest => learner.random_forest(x_train, y_train, x_test, gridsearch),
            ModelKind::KNearestNeighbor => learner.k_nearest_neighbor(x_train, y_train, x_test, gridsearch),
            ModelKind::DecisionTree => learner.decision_tree(x_train, y_train, x_test, gridsearch),
            ModelKind::NaiveBayes => learner.naive_bayes(x_train, y_train, x_test, gridsearch),
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.abbreviation())
    }
}

// ── ScoreTable ────────────────────────────────────────────────────────────────

/// Test accuracy of one model family on one feature set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelScore {
    pub model: ModelKind,
    pub feature_set: String,
    pub accuracy: f64,
}

/// Scores sorted by accuracy, best first.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScoreTable {
    rows: Vec<ModelScore>,
}

impl ScoreTable {
    /// Sorting is stable, so equal scores keep insertion order.
    pub fn new(mut rows: Vec<ModelScore>) -> Self {
        rows.sort_by(|a, b| b.accuracy.total_cmp(&a.accuracy));
        Self { rows }
    }

    pub fn rows(&self) -> &[ModelScore] {
        &self.rows
    }

    pub fn best(&self) -> Option<&ModelScore> {
        self.rows.first()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// ── compare_models ────────────────────────────────────────────────────────────

/// Fit every model family on every feature set and score it on `test`.
///
/// Stochastic families are fitted `iterations` times (at least once) and
/// their accuracies averaged; deterministic ones are fitted once.
pub fn compare_models<L: Learner + ?Sized>(
    learner: &mut L,
    train: &FeatureTable,
    test: &FeatureTable,
    feature_sets: &FeatureSets,
    iterations: usize,
) -> Result<ScoreTable> {
    if train.is_empty() {
        return Err(LearnError::EmptySplit("train"));
    }
    if test.is_empty() {
        return Err(LearnError::EmptySplit("test"));
    }
    let iterations = iterations.max(1);

    let mut scores = Vec::with_capacity(feature_sets.len() * ModelKind::ALL.len());
    for set in feature_sets.iter() {
        info!("Evaluating feature set \"{}\" ({} features)", set.name, set.features.len());
        let train_x = train.select(&set.features)?;
        let test_x = test.select(&set.features)?;

        for model in ModelKind::ALL {
            let runs = if model.is_stochastic() { iterations } else { 1 };
            let mut total = 0.0;
            for it in 0..runs {
                debug!("Training {} ({}), iteration {}", model, set.name, it);
                let output = model.run(learner, &train_x, &test_x, model.gridsearch())?;
                total += accuracy_score(test.labels(), &output.test_predictions)?;
            }

            scores.push(ModelScore {
                model,
                feature_set: set.name.clone(),
                accuracy: total / runs as f64,
            });
        }
    }

    Ok(ScoreTable::new(scores))
}

// ── evaluate_model ────────────────────────────────────────────────────────────

/// Test accuracy and confusion matrix of a single fit.
#[derive(Debug, Clone)]
pub struct ModelEvaluation {
    pub accuracy: f64,
    pub confusion: ConfusionMatrix,
    pub output: ClassifierOutput,
}

/// Fit `model` (tuned) on `features` and evaluate it on `test`.
///
/// The confusion matrix uses the learner's probability columns as its label
/// order, falling back to the sorted labels seen when those are absent.
pub fn evaluate_model<L: Learner + ?Sized, S: AsRef<str>>(
    learner: &mut L,
    model: ModelKind,
    train: &FeatureTable,
    test: &FeatureTable,
    features: &[S],
) -> Result<ModelEvaluation> {
    let train_x = train.select(features)?;
    let test_x = test.select(features)?;
    let output = model.run(learner, &train_x, &test_x, true)?;

    let accuracy = accuracy_score(test.labels(), &output.test_predictions)?;
    let classes = &output.test_probabilities.classes;
    let labels = (!classes.is_empty()).then_some(classes.as_slice());
    let confusion = confusion_matrix(test.labels(), &output.test_predictions, labels)?;

    info!("{} test accuracy: {:.4}", model, accuracy);
    Ok(ModelEvaluation {
        accuracy,
        confusion,
        output,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
