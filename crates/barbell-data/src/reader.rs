//! Recording discovery and CSV loading.
//!
//! Each recording file holds one sensor's samples for one set. Rows carry an
//! `epoch (ms)` column, a wall-clock `time (…)` column, an `elapsed (s)`
//! column and three `x-axis`/`y-axis`/`z-axis` channel columns. Only the
//! epoch and the channels survive parsing.

use std::io::Read;
use std::path::{Path, PathBuf};

use barbell_core::error::{PipelineError, Result};
use barbell_core::models::Reading;
use barbell_core::naming::{CategoryNormalizer, FileIdentifier};
use barbell_core::time_utils::from_epoch_millis;
use tracing::{debug, warn};

/// Header of the raw epoch-milliseconds column.
pub const EPOCH_COLUMN: &str = "epoch (ms)";

/// Header prefixes of the three channel columns (units vary per sensor).
pub const AXIS_PREFIXES: [&str; 3] = ["x-axis", "y-axis", "z-axis"];

// ── ParsedRecording ───────────────────────────────────────────────────────────

/// One recording file after identifier decoding and row parsing.
#[derive(Debug, Clone)]
pub struct ParsedRecording {
    pub path: PathBuf,
    pub identifier: FileIdentifier,
    pub readings: Vec<Reading>,
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Find all `.csv` files recursively under `data_path`, sorted by path.
///
/// Fails when the directory does not exist, holds no CSV files, or contains
/// an entry that cannot be walked (unreadable directory, symlink loop).
pub fn find_csv_files(data_path: &Path) -> Result<Vec<PathBuf>> {
    if !data_path.exists() {
        return Err(PipelineError::DataPathNotFound(data_path.to_path_buf()));
    }

    let mut files = Vec::new();
    for entry in walkdir::WalkDir::new(data_path).follow_links(true) {
        let entry = entry.map_err(|err| PipelineError::FileRead {
            path: err.path().unwrap_or(data_path).to_path_buf(),
            source: err.into(),
        })?;
        let is_csv = entry
            .path()
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("csv"))
            .unwrap_or(false);
        if entry.file_type().is_file() && is_csv {
            files.push(entry.into_path());
        }
    }

    if files.is_empty() {
        return Err(PipelineError::NoDataFiles(data_path.to_path_buf()));
    }

    files.sort();
    debug!("Found {} CSV files in {}", files.len(), data_path.display());
    Ok(files)
}

/// Decode the identifier of `path` and parse all of its rows.
///
/// The identifier is checked before the file is opened, so a misnamed file
/// fails fast without any I/O.
pub fn read_recording(path: &Path, normalizer: &CategoryNormalizer) -> Result<ParsedRecording> {
    let identifier = FileIdentifier::parse(path, normalizer)?;

    let file = std::fs::File::open(path).map_err(|source| PipelineError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    let readings = parse_readings(std::io::BufReader::new(file), path)?;

    debug!(
        "File {}: {} readings ({} / {} / {} / {})",
        path.display(),
        readings.len(),
        identifier.participant,
        identifier.label,
        identifier.category,
        identifier.sensor,
    );

    Ok(ParsedRecording {
        path: path.to_path_buf(),
        identifier,
        readings,
    })
}

/// Parse the CSV rows of one recording.
///
/// `path` is only used for error messages.
pub fn parse_readings<R: Read>(input: R, path: &Path) -> Result<Vec<Reading>> {
    let csv_err = |source: csv::Error| PipelineError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(input);

    let columns = ColumnLayout::from_headers(reader.headers().map_err(csv_err)?, path)?;

    let mut readings = Vec::new();
    let mut out_of_order = 0usize;

    for result in reader.records() {
        let record = result.map_err(csv_err)?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);

        let invalid = |column: &str, value: &str| PipelineError::InvalidValue {
            path: path.to_path_buf(),
            line,
            column: column.to_string(),
            value: value.to_string(),
        };

        // Records always match the header width (the reader is not flexible).
        let epoch_raw = record.get(columns.epoch).unwrap_or_default();
        let timestamp = parse_epoch_millis(epoch_raw)
            .and_then(from_epoch_millis)
            .ok_or_else(|| invalid(EPOCH_COLUMN, epoch_raw))?;

        let mut axes = [0.0f64; 3];
        for (slot, (&idx, name)) in axes
            .iter_mut()
            .zip(columns.axes.iter().zip(columns.axis_names.iter()))
        {
            let raw = record.get(idx).unwrap_or_default();
            *slot = raw
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| invalid(name.as_str(), raw))?;
        }

        if readings
            .last()
            .map(|prev: &Reading| timestamp < prev.timestamp)
            .unwrap_or(false)
        {
            out_of_order += 1;
        }

        readings.push(Reading {
            timestamp,
            x: axes[0],
            y: axes[1],
            z: axes[2],
        });
    }

    if out_of_order > 0 {
        warn!(
            "{}: {} rows go back in time within a single recording",
            path.display(),
            out_of_order
        );
    }

    Ok(readings)
}

// ── Internal helpers ──────────────────────────────────────────────────────────

/// Column indices of the fields that survive parsing.
///
/// The wall-clock and elapsed-seconds columns are never looked up, which is
/// how they get dropped.
struct ColumnLayout {
    epoch: usize,
    axes: [usize; 3],
    axis_names: [String; 3],
}

impl ColumnLayout {
    fn from_headers(headers: &csv::StringRecord, path: &Path) -> Result<Self> {
        let missing = |column: &str| PipelineError::MissingColumn {
            path: path.to_path_buf(),
            column: column.to_string(),
        };

        let epoch = headers
            .iter()
            .position(|h| h == EPOCH_COLUMN)
            .ok_or_else(|| missing(EPOCH_COLUMN))?;

        let mut axes = [0usize; 3];
        let mut axis_names: [String; 3] = Default::default();
        for (i, prefix) in AXIS_PREFIXES.iter().enumerate() {
            let idx = headers
                .iter()
                .position(|h| h.starts_with(prefix))
                .ok_or_else(|| missing(prefix))?;
            axes[i] = idx;
            axis_names[i] = headers.get(idx).unwrap_or(prefix).to_string();
        }

        Ok(Self {
            epoch,
            axes,
            axis_names,
        })
    }
}

/// Parse an epoch-milliseconds cell, accepting integral float notation.
fn parse_epoch_millis(raw: &str) -> Option<i64> {
    if let Ok(ms) = raw.parse::<i64>() {
        return Some(ms);
    }
    let f = raw.parse::<f64>().ok()?;
    if f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
