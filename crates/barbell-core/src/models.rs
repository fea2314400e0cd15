use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Output column names in their fixed order (the timestamp index is separate).
pub const COLUMNS: [&str; 10] = [
    "acc_x",
    "acc_y",
    "acc_z",
    "gyr_x",
    "gyr_y",
    "gyr_z",
    "participant",
    "label",
    "category",
    "set",
];

/// The six inertial channels, in output order.
pub const CHANNEL_COLUMNS: [&str; 6] = ["acc_x", "acc_y", "acc_z", "gyr_x", "gyr_y", "gyr_z"];

// ── SensorKind ────────────────────────────────────────────────────────────────

/// Which inertial sensor produced a recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorKind {
    Accelerometer,
    Gyroscope,
}

impl SensorKind {
    pub const ALL: [SensorKind; 2] = [SensorKind::Accelerometer, SensorKind::Gyroscope];

    /// The marker that must appear in a file identifier of this sensor.
    pub fn marker(self) -> &'static str {
        match self {
            SensorKind::Accelerometer => "Accelerometer",
            SensorKind::Gyroscope => "Gyroscope",
        }
    }

    /// Classify a file identifier by its sensor marker.
    ///
    /// Returns `None` when the identifier contains neither marker or both;
    /// callers turn that into a fatal
    /// [`PipelineError::AmbiguousSensor`](crate::error::PipelineError::AmbiguousSensor).
    pub fn classify(identifier: &str) -> Option<SensorKind> {
        let mut matches = Self::ALL
            .into_iter()
            .filter(|kind| identifier.contains(kind.marker()));
        match (matches.next(), matches.next()) {
            (Some(kind), None) => Some(kind),
            _ => None,
        }
    }
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.marker())
    }
}

// ── Reading / SessionTag ──────────────────────────────────────────────────────

/// A single three-axis sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Sample time, converted from the raw epoch-milliseconds column.
    pub timestamp: DateTime<Utc>,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Metadata attached to every row of one recording file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionTag {
    pub participant: String,
    pub label: String,
    /// Category after suffix normalisation (e.g. `"heavy"`).
    pub category: String,
    pub sensor: SensorKind,
    /// Sequential session number per sensor, starting at 1.
    pub set: u32,
}

/// A reading stamped with the tag of the file it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorRow {
    pub reading: Reading,
    pub participant: String,
    pub label: String,
    pub category: String,
    pub set: u32,
}

impl SensorRow {
    pub fn new(reading: Reading, tag: &SessionTag) -> Self {
        Self {
            reading,
            participant: tag.participant.clone(),
            label: tag.label.clone(),
            category: tag.category.clone(),
            set: tag.set,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.reading.timestamp
    }
}

// ── SensorTable ───────────────────────────────────────────────────────────────

/// All rows of one sensor type, in file-processing order.
///
/// Timestamps increase within a set but not necessarily across sets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorTable {
    pub kind: SensorKind,
    pub rows: Vec<SensorRow>,
}

impl SensorTable {
    pub fn new(kind: SensorKind, rows: Vec<SensorRow>) -> Self {
        Self { kind, rows }
    }

    pub fn empty(kind: SensorKind) -> Self {
        Self::new(kind, Vec::new())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// ── MergedRow ─────────────────────────────────────────────────────────────────

/// One timestamp where both sensors contributed a sample.
///
/// Every field is required, so a merged table can never hold a partially
/// populated row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedRow {
    pub timestamp: DateTime<Utc>,
    pub acc_x: f64,
    pub acc_y: f64,
    pub acc_z: f64,
    pub gyr_x: f64,
    pub gyr_y: f64,
    pub gyr_z: f64,
    pub participant: String,
    pub label: String,
    pub category: String,
    pub set: u32,
}

impl MergedRow {
    /// Channel values in [`CHANNEL_COLUMNS`] order.
    pub fn channels(&self) -> [f64; 6] {
        [
            self.acc_x, self.acc_y, self.acc_z, self.gyr_x, self.gyr_y, self.gyr_z,
        ]
    }
}

// ── ResampledRow ──────────────────────────────────────────────────────────────

/// One fixed-width bucket of the final table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResampledRow {
    /// Left edge of the bucket.
    pub timestamp: DateTime<Utc>,
    pub acc_x: f64,
    pub acc_y: f64,
    pub acc_z: f64,
    pub gyr_x: f64,
    pub gyr_y: f64,
    pub gyr_z: f64,
    pub participant: String,
    pub label: String,
    pub category: String,
    pub set: i64,
}

impl ResampledRow {
    /// Channel values in [`CHANNEL_COLUMNS`] order.
    pub fn channels(&self) -> [f64; 6] {
        [
            self.acc_x, self.acc_y, self.acc_z, self.gyr_x, self.gyr_y, self.gyr_z,
        ]
    }
}
