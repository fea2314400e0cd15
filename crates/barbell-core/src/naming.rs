//! Recording file naming convention.
//!
//! Recordings are named `<participant>-<label>-<category>[_<device>…]…` with
//! a sensor marker (`Accelerometer` / `Gyroscope`) somewhere in the name, e.g.
//! `A-bench-heavy2_MetaWear_2019-01-14T14.22.49.165_C42732BE255C_Accelerometer_12.500Hz_1.4.4.csv`.

use std::path::Path;

use regex::Regex;

use crate::error::{PipelineError, Result};
use crate::models::{SensorKind, SessionTag};

/// Device token appended to the category field by the MetaWear exporter.
pub const DEFAULT_DEVICE_SUFFIX: &str = "_MetaWear_2019";

const FIELD_DELIMITER: char = '-';

// ── CategoryNormalizer ────────────────────────────────────────────────────────

/// Reduces raw category tokens (`"heavy2"`, `"squat_MetaWear_2019"`) to their
/// canonical form (`"heavy"`, `"squat"`).
#[derive(Debug, Clone)]
pub struct CategoryNormalizer {
    suffix: Regex,
}

impl CategoryNormalizer {
    /// Build a normaliser that strips `device_suffix` (and everything after
    /// it), any other `_`-introduced device marker, then trailing digits.
    pub fn new(device_suffix: &str) -> Result<Self> {
        let pattern = if device_suffix.is_empty() {
            "_.*$".to_string()
        } else {
            format!("(?:{}|_).*$", regex::escape(device_suffix))
        };
        let suffix = Regex::new(&pattern)
            .map_err(|e| PipelineError::Config(format!("invalid device suffix: {}", e)))?;
        Ok(Self { suffix })
    }

    pub fn normalize(&self, raw: &str) -> String {
        let without_device = self.suffix.replace(raw, "");
        without_device
            .trim_end_matches(|c: char| c.is_ascii_digit())
            .to_string()
    }
}

impl Default for CategoryNormalizer {
    fn default() -> Self {
        Self::new(DEFAULT_DEVICE_SUFFIX).expect("regex is valid")
    }
}

/// Normalise with the default MetaWear device suffix.
///
/// ```
/// use barbell_core::naming::normalize_category;
///
/// assert_eq!(normalize_category("squat1"), "squat");
/// assert_eq!(normalize_category("squat_MetaWear_2019"), "squat");
/// assert_eq!(normalize_category("heavy2_MetaWear_2019"), "heavy");
/// ```
pub fn normalize_category(raw: &str) -> String {
    CategoryNormalizer::default().normalize(raw)
}

// ── FileIdentifier ────────────────────────────────────────────────────────────

/// Metadata decoded from a recording's file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileIdentifier {
    pub participant: String,
    pub label: String,
    pub category: String,
    pub sensor: SensorKind,
}

impl FileIdentifier {
    /// Decode the identifier of `path`.
    ///
    /// Only the file name is inspected, so any directory prefix is ignored.
    /// Fails with [`PipelineError::MalformedIdentifier`] when fewer than three
    /// delimited fields are present or any of them is empty, and with
    /// [`PipelineError::AmbiguousSensor`] when the sensor marker is missing or
    /// duplicated.
    pub fn parse(path: &Path, normalizer: &CategoryNormalizer) -> Result<Self> {
        let malformed = |reason: String| PipelineError::MalformedIdentifier {
            path: path.to_path_buf(),
            reason,
        };

        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| malformed("file name is missing or not valid UTF-8".to_string()))?;

        let sensor = SensorKind::classify(file_name).ok_or_else(|| {
            PipelineError::AmbiguousSensor {
                path: path.to_path_buf(),
            }
        })?;

        let fields: Vec<&str> = file_name.split(FIELD_DELIMITER).collect();
        if fields.len() < 3 {
            return Err(malformed(format!(
                "expected at least 3 '{}' separated fields, found {}",
                FIELD_DELIMITER,
                fields.len()
            )));
        }

        let participant = fields[0].trim();
        let label = fields[1].trim();
        let category = normalizer.normalize(fields[2].trim());

        if participant.is_empty() {
            return Err(malformed("participant field is empty".to_string()));
        }
        if label.is_empty() {
            return Err(malformed("label field is empty".to_string()));
        }
        if category.is_empty() {
            return Err(malformed(format!(
                "category field {:?} is empty after normalisation",
                fields[2]
            )));
        }

        Ok(Self {
            participant: participant.to_string(),
            label: label.to_string(),
            category,
            sensor,
        })
    }

    /// Attach a set number, producing the tag stamped on every row of the file.
    pub fn into_tag(self, set: u32) -> SessionTag {
        SessionTag {
            participant: self.participant,
            label: self.label,
            category: self.category,
            sensor: self.sensor,
            set,
        }
    }
}
