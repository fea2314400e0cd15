//! Numeric feature tables built from the resampled sensor data.

use std::collections::BTreeSet;

use barbell_core::models::{ResampledRow, CHANNEL_COLUMNS};

use crate::error::{LearnError, Result};

/// The six raw inertial channels.
pub const BASIC_FEATURES: [&str; 6] = CHANNEL_COLUMNS;

/// Euclidean magnitude of each sensor's three axes.
pub const MAGNITUDE_FEATURES: [&str; 2] = ["acc_r", "gyr_r"];

fn magnitude(x: f64, y: f64, z: f64) -> f64 {
    (x * x + y * y + z * z).sqrt()
}

// ── FeatureMatrix ─────────────────────────────────────────────────────────────

/// Row-major matrix of named numeric columns.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    names: Vec<String>,
    rows: Vec<Vec<f64>>,
}

impl FeatureMatrix {
    /// Every row must have exactly one value per name.
    pub fn new(names: Vec<String>, rows: Vec<Vec<f64>>) -> Result<Self> {
        if let Some(bad) = rows.iter().find(|r| r.len() != names.len()) {
            return Err(LearnError::LengthMismatch {
                expected: names.len(),
                actual: bad.len(),
            });
        }
        Ok(Self { names, rows })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn n_features(&self) -> usize {
        self.names.len()
    }

    fn index_of(&self, name: &str) -> Result<usize> {
        self.names
            .iter()
            .position(|n| n == name)
            .ok_or_else(|| LearnError::UnknownFeature(name.to_string()))
    }

    /// All values of one column.
    pub fn column(&self, name: &str) -> Result<Vec<f64>> {
        let idx = self.index_of(name)?;
        Ok(self.rows.iter().map(|r| r[idx]).collect())
    }

    /// Keep only the named columns, in the order given.
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Result<FeatureMatrix> {
        let indices = names
            .iter()
            .map(|n| self.index_of(n.as_ref()))
            .collect::<Result<Vec<_>>>()?;

        Ok(FeatureMatrix {
            names: indices.iter().map(|&i| self.names[i].clone()).collect(),
            rows: self
                .rows
                .iter()
                .map(|r| indices.iter().map(|&i| r[i]).collect())
                .collect(),
        })
    }

    pub(crate) fn take(&self, indices: &[usize]) -> FeatureMatrix {
        FeatureMatrix {
            names: self.names.clone(),
            rows: indices.iter().map(|&i| self.rows[i].clone()).collect(),
        }
    }
}

// ── FeatureTable ──────────────────────────────────────────────────────────────

/// Features plus the label and participant of every row.
///
/// The participant column is carried for splitting only and never appears
/// among the features.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTable {
    features: FeatureMatrix,
    labels: Vec<String>,
    participants: Vec<String>,
}

impl FeatureTable {
    pub fn new(features: FeatureMatrix, labels: Vec<String>, participants: Vec<String>) -> Result<Self> {
        for actual in [labels.len(), participants.len()] {
            if actual != features.len() {
                return Err(LearnError::LengthMismatch {
                    expected: features.len(),
                    actual,
                });
            }
        }
        Ok(Self {
            features,
            labels,
            participants,
        })
    }

    /// Basic channel features plus `acc_r` and `gyr_r`.
    pub fn from_resampled(rows: &[ResampledRow]) -> Self {
        let names = BASIC_FEATURES
            .iter()
            .chain(MAGNITUDE_FEATURES.iter())
            .map(|s| s.to_string())
            .collect();

        let values = rows
            .iter()
            .map(|r| {
                let mut v = r.channels().to_vec();
                v.push(magnitude(r.acc_x, r.acc_y, r.acc_z));
                v.push(magnitude(r.gyr_x, r.gyr_y, r.gyr_z));
                v
            })
            .collect();

        Self {
            features: FeatureMatrix { names, rows: values },
            labels: rows.iter().map(|r| r.label.clone()).collect(),
            participants: rows.iter().map(|r| r.participant.clone()).collect(),
        }
    }

    pub fn features(&self) -> &FeatureMatrix {
        &self.features
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn participants(&self) -> &[String] {
        &self.participants
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Distinct labels in sorted order.
    pub fn classes(&self) -> Vec<String> {
        self.labels
            .iter()
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Same rows, restricted to the named feature columns.
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Result<FeatureTable> {
        Ok(FeatureTable {
            features: self.features.select(names)?,
            labels: self.labels.clone(),
            participants: self.participants.clone(),
        })
    }

    pub(crate) fn take(&self, indices: &[usize]) -> FeatureTable {
        FeatureTable {
            features: self.features.take(indices),
            labels: indices.iter().map(|&i| self.labels[i].clone()).collect(),
            participants: indices.iter().map(|&i| self.participants[i].clone()).collect(),
        }
    }
}

// ── FeatureSets ───────────────────────────────────────────────────────────────

/// A named list of feature columns, without duplicates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureSet {
    pub name: String,
    pub features: Vec<String>,
}

impl FeatureSet {
    /// Duplicate names are dropped; first occurrence keeps its position.
    pub fn new<I, S>(name: impl Into<String>, features: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = BTreeSet::new();
        let features = features
            .into_iter()
            .map(Into::into)
            .filter(|f: &String| seen.insert(f.clone()))
            .collect();
        Self {
            name: name.into(),
            features,
        }
    }
}

/// Ordered collection of feature sets to compare models on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeatureSets {
    sets: Vec<FeatureSet>,
}

impl FeatureSets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw channels alone, then raw channels with magnitudes.
    pub fn standard() -> Self {
        let mut sets = Self::new();
        sets.push(FeatureSet::new("Feature set 1", BASIC_FEATURES));
        sets.push(FeatureSet::new(
            "Feature set 2",
            BASIC_FEATURES.iter().chain(MAGNITUDE_FEATURES.iter()).copied(),
        ));
        sets
    }

    pub fn push(&mut self, set: FeatureSet) {
        self.sets.push(set);
    }

    pub fn iter(&self) -> impl Iterator<Item = &FeatureSet> {
        self.sets.iter()
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
