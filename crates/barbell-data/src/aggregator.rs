//! Per-sensor stream assembly.
//!
//! Every recording file becomes one set. Set numbers are assigned per sensor
//! in file-processing order, so the n-th accelerometer file is accelerometer
//! set n regardless of how many gyroscope files came before it.

use std::collections::BTreeMap;
use std::path::PathBuf;

use barbell_core::error::Result;
use barbell_core::models::{SensorKind, SensorRow, SensorTable};
use barbell_core::naming::CategoryNormalizer;
use serde::Serialize;
use tracing::{info, warn};

use crate::reader::{read_recording, ParsedRecording};

// ── SetCounter ────────────────────────────────────────────────────────────────

/// Running set number per sensor, starting at 1.
#[derive(Debug, Default)]
struct SetCounter {
    accelerometer: u32,
    gyroscope: u32,
}

impl SetCounter {
    /// Advance the counter of `kind` and return the new set number.
    fn next(&mut self, kind: SensorKind) -> u32 {
        let slot = match kind {
            SensorKind::Accelerometer => &mut self.accelerometer,
            SensorKind::Gyroscope => &mut self.gyroscope,
        };
        *slot += 1;
        *slot
    }
}

// ── AggregationSummary ────────────────────────────────────────────────────────

/// File and row counts for one sensor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SensorSummary {
    pub files: usize,
    pub rows: usize,
}

/// What went into the two sensor tables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AggregationSummary {
    pub accelerometer: SensorSummary,
    pub gyroscope: SensorSummary,
    /// Recording files per participant, both sensors combined.
    pub recordings_per_participant: BTreeMap<String, usize>,
}

impl AggregationSummary {
    fn sensor_mut(&mut self, kind: SensorKind) -> &mut SensorSummary {
        match kind {
            SensorKind::Accelerometer => &mut self.accelerometer,
            SensorKind::Gyroscope => &mut self.gyroscope,
        }
    }
}

// ── AggregatedStreams ─────────────────────────────────────────────────────────

/// The two sensor tables produced from one ingestion run.
#[derive(Debug, Clone)]
pub struct AggregatedStreams {
    pub accelerometer: SensorTable,
    pub gyroscope: SensorTable,
    pub summary: AggregationSummary,
}

// ── StreamAggregator ──────────────────────────────────────────────────────────

/// Parses recording files and assembles the per-sensor tables.
pub struct StreamAggregator {
    normalizer: CategoryNormalizer,
}

impl StreamAggregator {
    pub fn new(normalizer: CategoryNormalizer) -> Self {
        Self { normalizer }
    }

    /// Parse every file in `files` (in the given order) and assemble the
    /// accelerometer and gyroscope tables.
    ///
    /// The first file that fails to parse aborts the run; no partially
    /// tagged table is ever returned.
    pub fn aggregate(&self, files: &[PathBuf]) -> Result<AggregatedStreams> {
        let recordings = files
            .iter()
            .map(|path| read_recording(path, &self.normalizer))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::assemble(recordings))
    }

    /// Number and stamp already-parsed recordings, then concatenate each
    /// sensor's rows once.
    pub fn assemble(recordings: Vec<ParsedRecording>) -> AggregatedStreams {
        let mut counter = SetCounter::default();
        let mut summary = AggregationSummary::default();
        let mut acc_parts: Vec<Vec<SensorRow>> = Vec::new();
        let mut gyr_parts: Vec<Vec<SensorRow>> = Vec::new();

        for recording in recordings {
            let kind = recording.identifier.sensor;
            let set = counter.next(kind);
            let tag = recording.identifier.into_tag(set);

            let rows: Vec<SensorRow> = recording
                .readings
                .into_iter()
                .map(|reading| SensorRow::new(reading, &tag))
                .collect();

            let sensor = summary.sensor_mut(kind);
            sensor.files += 1;
            sensor.rows += rows.len();
            *summary
                .recordings_per_participant
                .entry(tag.participant.clone())
                .or_default() += 1;

            match kind {
                SensorKind::Accelerometer => acc_parts.push(rows),
                SensorKind::Gyroscope => gyr_parts.push(rows),
            }
        }

        if summary.accelerometer.files != summary.gyroscope.files {
            warn!(
                "Unpaired recordings: {} accelerometer files vs {} gyroscope files; set numbers will not line up",
                summary.accelerometer.files, summary.gyroscope.files
            );
        }

        info!(
            "Aggregated {} accelerometer rows from {} files and {} gyroscope rows from {} files",
            summary.accelerometer.rows,
            summary.accelerometer.files,
            summary.gyroscope.rows,
            summary.gyroscope.files,
        );

        AggregatedStreams {
            accelerometer: SensorTable::new(SensorKind::Accelerometer, acc_parts.concat()),
            gyroscope: SensorTable::new(SensorKind::Gyroscope, gyr_parts.concat()),
            summary,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use barbell_core::error::PipelineError;
    use barbell_core::models::Reading;
    use barbell_core::naming::FileIdentifier;
    use barbell_core::time_utils::from_epoch_millis;
    use std::io::Write;
    use std::path::Path;
    use tempfile::TempDir;

    // ── Helpers ───────────────────────────────────────────────────────────────

    fn recording(name: &str, epochs: &[i64]) -> ParsedRecording {
        let path = PathBuf::from(name);
        ParsedRecording {
            identifier: FileIdentifier::parse(&path, &CategoryNormalizer::default()).unwrap(),
            path,
            readings: epochs
                .iter()
                .map(|&ms| Reading {
                    timestamp: from_epoch_millis(ms).unwrap(),
                    x: ms as f64,
                    y: 0.0,
                    z: 0.0,
                })
                .collect(),
        }
    }

    fn sets(table: &SensorTable) -> Vec<u32> {
        let mut sets: Vec<u32> = table.rows.iter().map(|r| r.set).collect();
        sets.dedup();
        sets
    }

    fn write_csv(dir: &Path, name: &str, epochs: &[i64]) -> PathBuf {
        let path = dir.join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "epoch (ms),time (01:00),elapsed (s),x-axis (g),y-axis (g),z-axis (g)").unwrap();
        for ms in epochs {
            writeln!(file, "{},t,0,1,1,1", ms).unwrap();
        }
        path
    }

    // ── assemble ──────────────────────────────────────────────────────────────

    #[test]
    fn test_set_numbers_dense_per_sensor() {
        let streams = StreamAggregator::assemble(vec![
            recording("A-bench-heavy_Accelerometer.csv", &[0, 80]),
            recording("A-bench-heavy_Gyroscope.csv", &[0, 40, 80]),
            recording("A-squat-medium_Accelerometer.csv", &[1000]),
            recording("B-row-heavy_Accelerometer.csv", &[2000, 2080]),
            recording("A-squat-medium_Gyroscope.csv", &[1000]),
        ]);

        assert_eq!(sets(&streams.accelerometer), vec![1, 2, 3]);
        assert_eq!(sets(&streams.gyroscope), vec![1, 2]);
    }

    #[test]
    fn test_set_counted_per_file_not_per_row() {
        let streams = StreamAggregator::assemble(vec![
            recording("A-bench-heavy_Accelerometer.csv", &[0, 80, 160, 240]),
            recording("A-bench-heavy2_Accelerometer.csv", &[10_000]),
        ]);
        let all: Vec<u32> = streams.accelerometer.rows.iter().map(|r| r.set).collect();
        assert_eq!(all, vec![1, 1, 1, 1, 2]);
    }

    #[test]
    fn test_rows_keep_file_order() {
        // Later file has earlier timestamps; concatenation keeps file order.
        let streams = StreamAggregator::assemble(vec![
            recording("A-bench-heavy_Accelerometer.csv", &[5000, 5080]),
            recording("A-ohp-heavy_Accelerometer.csv", &[100, 180]),
        ]);
        let epochs: Vec<i64> = streams
            .accelerometer
            .rows
            .iter()
            .map(|r| r.timestamp().timestamp_millis())
            .collect();
        assert_eq!(epochs, vec![5000, 5080, 100, 180]);
    }

    #[test]
    fn test_rows_carry_tag_metadata() {
        let streams = StreamAggregator::assemble(vec![recording(
            "B-dead-medium3_MetaWear_2019_Gyroscope.csv",
            &[0],
        )]);
        let row = &streams.gyroscope.rows[0];
        assert_eq!(row.participant, "B");
        assert_eq!(row.label, "dead");
        assert_eq!(row.category, "medium");
        assert_eq!(row.set, 1);
        assert!(streams.accelerometer.is_empty());
    }

    #[test]
    fn test_summary_counts() {
        let streams = StreamAggregator::assemble(vec![
            recording("A-bench-heavy_Accelerometer.csv", &[0, 80]),
            recording("A-bench-heavy_Gyroscope.csv", &[0, 40, 80]),
            recording("B-bench-heavy_Gyroscope.csv", &[0]),
        ]);

        assert_eq!(streams.summary.accelerometer, SensorSummary { files: 1, rows: 2 });
        assert_eq!(streams.summary.gyroscope, SensorSummary { files: 2, rows: 4 });
        assert_eq!(streams.summary.recordings_per_participant["A"], 2);
        assert_eq!(streams.summary.recordings_per_participant["B"], 1);
    }

    #[test]
    fn test_assemble_empty() {
        let streams = StreamAggregator::assemble(Vec::new());
        assert!(streams.accelerometer.is_empty());
        assert!(streams.gyroscope.is_empty());
    }

    // ── aggregate ─────────────────────────────────────────────────────────────

    #[test]
    fn test_aggregate_reads_files() {
        let dir = TempDir::new().unwrap();
        let files = vec![
            write_csv(dir.path(), "P1-bench-heavy_Accelerometer.csv", &[0, 100, 200]),
            write_csv(dir.path(), "P1-bench-heavy_Gyroscope.csv", &[0, 100, 200]),
        ];

        let streams = StreamAggregator::new(CategoryNormalizer::default())
            .aggregate(&files)
            .unwrap();
        assert_eq!(streams.accelerometer.len(), 3);
        assert_eq!(streams.gyroscope.len(), 3);
    }

    #[test]
    fn test_aggregate_aborts_on_bad_file() {
        let dir = TempDir::new().unwrap();
        let files = vec![
            write_csv(dir.path(), "P1-bench-heavy_Accelerometer.csv", &[0]),
            write_csv(dir.path(), "P1-bench-heavy_Magnetometer.csv", &[0]),
        ];

        let err = StreamAggregator::new(CategoryNormalizer::default())
            .aggregate(&files)
            .unwrap_err();
        assert!(matches!(err, PipelineError::AmbiguousSensor { .. }));
        assert!(err.to_string().contains("Magnetometer"));
    }
}
