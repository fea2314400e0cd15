//! End-to-end preprocessing pipeline.
//!
//! Discovers recording files, aggregates them per sensor, merges the two
//! sensors on timestamp, resamples into fixed buckets and exports the
//! result, returning a [`PipelineResult`] with per-stage accounting.

use std::path::PathBuf;
use std::time::Instant;

use barbell_core::error::Result;
use barbell_core::models::ResampledRow;
use barbell_core::settings::PipelineConfig;
use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info};

use crate::aggregator::{AggregationSummary, StreamAggregator};
use crate::exporter::{write_parquet, write_summary};
use crate::merger::{merge_streams, MergeStats};
use crate::reader::find_csv_files;
use crate::resampler::{DayPartition, PreviewRow, Resampler};

// ── Public types ──────────────────────────────────────────────────────────────

/// Wall-clock seconds spent in each stage.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StageTimings {
    pub load_seconds: f64,
    pub merge_seconds: f64,
    pub resample_seconds: f64,
    pub export_seconds: f64,
}

/// Metadata produced alongside the resampled table; also the JSON summary.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineMetadata {
    /// ISO-8601 timestamp when this result was generated.
    pub generated_at: String,
    pub data_dir: PathBuf,
    pub output: PathBuf,
    pub bucket_ms: i64,
    pub timezone: String,
    /// Number of CSV files discovered.
    pub files_processed: usize,
    pub aggregation: AggregationSummary,
    pub merge: MergeStats,
    pub merged_rows: usize,
    pub resampled_rows: usize,
    pub days: Vec<DayPartition>,
    pub timings: StageTimings,
}

/// The complete output of [`run_pipeline`].
#[derive(Debug, Clone)]
pub struct PipelineResult {
    pub rows: Vec<ResampledRow>,
    pub metadata: PipelineMetadata,
    /// Diagnostic grid, present when a preview was requested.
    pub preview: Option<Vec<PreviewRow>>,
}

// ── Public function ───────────────────────────────────────────────────────────

/// Run the full preprocessing pipeline.
///
/// 1. Discover CSV files under `config.data_dir`.
/// 2. Parse and tag them into accelerometer and gyroscope tables.
/// 3. Merge the two tables on exact timestamp.
/// 4. Resample per calendar day.
/// 5. Write the Parquet table, plus the JSON summary when configured.
///
/// Any ingestion error aborts the run before anything is written.
pub fn run_pipeline(config: &PipelineConfig) -> Result<PipelineResult> {
    // ── Step 1 + 2: Load ──────────────────────────────────────────────────────
    let load_start = Instant::now();
    let files = find_csv_files(&config.data_dir)?;
    info!("Found {} CSV files in {}", files.len(), config.data_dir.display());
    let streams = StreamAggregator::new(config.normalizer.clone()).aggregate(&files)?;
    let load_seconds = load_start.elapsed().as_secs_f64();

    // ── Step 3: Merge ─────────────────────────────────────────────────────────
    let merge_start = Instant::now();
    let merged = merge_streams(&streams.accelerometer, &streams.gyroscope)?;
    let merge_seconds = merge_start.elapsed().as_secs_f64();

    // ── Step 4: Resample ──────────────────────────────────────────────────────
    let resample_start = Instant::now();
    let resampler = Resampler::from_config(config);
    let preview = config.preview.map(|limit| resampler.preview(&merged.rows, limit));
    let resampled = resampler.resample(&merged.rows);
    let resample_seconds = resample_start.elapsed().as_secs_f64();

    // ── Step 5: Export ────────────────────────────────────────────────────────
    let export_start = Instant::now();
    write_parquet(&config.output, &resampled.rows)?;
    let export_seconds = export_start.elapsed().as_secs_f64();

    let metadata = PipelineMetadata {
        generated_at: Utc::now().to_rfc3339(),
        data_dir: config.data_dir.clone(),
        output: config.output.clone(),
        bucket_ms: config.bucket_width.num_milliseconds(),
        timezone: config.timezone.tz().name().to_string(),
        files_processed: files.len(),
        aggregation: streams.summary,
        merge: merged.stats,
        merged_rows: merged.rows.len(),
        resampled_rows: resampled.rows.len(),
        days: resampled.days,
        timings: StageTimings {
            load_seconds,
            merge_seconds,
            resample_seconds,
            export_seconds,
        },
    };

    if let Some(path) = &config.summary {
        write_summary(path, &metadata)?;
    }

    debug!(
        "Pipeline timings: load {:.3}s, merge {:.3}s, resample {:.3}s, export {:.3}s",
        load_seconds, merge_seconds, resample_seconds, export_seconds
    );

    Ok(PipelineResult {
        rows: resampled.rows,
        metadata,
        preview,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exporter::read_parquet;
    use barbell_core::error::PipelineError;
    use barbell_core::time_utils::TimezoneHandler;
    use chrono::TimeDelta;
    use std::io::Write;
    use std::path::Path;
    use tempfile::TempDir;

    const HEADER: &str = "epoch (ms),time (01:00),elapsed (s),x-axis (g),y-axis (g),z-axis (g)";
    const DAY_MS: i64 = 24 * 60 * 60 * 1000;

    fn write_csv(dir: &Path, name: &str, samples: &[(i64, f64)]) {
        let mut file = std::fs::File::create(dir.join(name)).unwrap();
        writeln!(file, "{}", HEADER).unwrap();
        for (ms, v) in samples {
            writeln!(file, "{},2019-01-11T15:10:08.270,0.000,{},{},{}", ms, v, v, v).unwrap();
        }
    }

    fn config(tmp: &TempDir) -> PipelineConfig {
        let data = tmp.path().join("raw");
        std::fs::create_dir_all(&data).unwrap();
        PipelineConfig::new(data, tmp.path().join("interim").join("out.parquet"))
    }

    // ── run_pipeline ──────────────────────────────────────────────────────────

    #[test]
    fn test_pipeline_two_file_scenario() {
        let tmp = TempDir::new().expect("tempdir");
        let cfg = config(&tmp);
        write_csv(&cfg.data_dir, "P1-bench-heavy_Accelerometer.csv", &[(0, 1.0), (100, 1.0), (200, 1.0)]);
        write_csv(&cfg.data_dir, "P1-bench-heavy_Gyroscope.csv", &[(0, 2.0), (100, 2.0), (200, 2.0)]);

        let result = run_pipeline(&cfg).unwrap();

        // Three merged rows fall into buckets [0, 200) and [200, 400).
        assert_eq!(result.metadata.merged_rows, 3);
        assert_eq!(result.rows.len(), 2);
        for row in &result.rows {
            assert_eq!(row.channels(), [1.0, 1.0, 1.0, 2.0, 2.0, 2.0]);
            assert_eq!(row.participant, "P1");
            assert_eq!(row.label, "bench");
            assert_eq!(row.category, "heavy");
            assert_eq!(row.set, 1);
        }

        assert_eq!(read_parquet(&cfg.output).unwrap(), result.rows);
    }

    #[test]
    fn test_pipeline_metadata_counts() {
        let tmp = TempDir::new().expect("tempdir");
        let cfg = config(&tmp);
        write_csv(&cfg.data_dir, "A-squat-medium1_MetaWear_2019_Accelerometer.csv", &[(0, 1.0), (80, 1.0), (160, 1.0)]);
        write_csv(
            &cfg.data_dir,
            "A-squat-medium1_MetaWear_2019_Gyroscope.csv",
            &[(0, 2.0), (40, 2.0), (80, 2.0), (120, 2.0), (160, 2.0)],
        );

        let result = run_pipeline(&cfg).unwrap();
        let meta = &result.metadata;

        assert_eq!(meta.files_processed, 2);
        assert_eq!(meta.aggregation.accelerometer.rows, 3);
        assert_eq!(meta.aggregation.gyroscope.rows, 5);
        assert_eq!(meta.merge.matched, 3);
        assert_eq!(meta.merge.gyr_only, 2);
        assert_eq!(meta.bucket_ms, 200);
        assert_eq!(meta.timezone, "UTC");
        assert_eq!(result.rows[0].category, "medium");
        assert!(result.preview.is_none());
    }

    #[test]
    fn test_pipeline_separates_days_and_sets() {
        let tmp = TempDir::new().expect("tempdir");
        let cfg = config(&tmp);
        let day2 = DAY_MS + 3_600_000;
        write_csv(&cfg.data_dir, "A-bench-heavy_Accelerometer.csv", &[(0, 1.0)]);
        write_csv(&cfg.data_dir, "A-bench-heavy_Gyroscope.csv", &[(0, 1.0)]);
        write_csv(&cfg.data_dir, "B-row-medium_Accelerometer.csv", &[(day2, 3.0)]);
        write_csv(&cfg.data_dir, "B-row-medium_Gyroscope.csv", &[(day2, 3.0)]);

        let result = run_pipeline(&cfg).unwrap();

        assert_eq!(result.metadata.days.len(), 2);
        assert_eq!(result.rows.len(), 2);
        assert_eq!((result.rows[0].participant.as_str(), result.rows[0].set), ("A", 1));
        assert_eq!((result.rows[1].participant.as_str(), result.rows[1].set), ("B", 2));
    }

    #[test]
    fn test_pipeline_writes_summary() {
        let tmp = TempDir::new().expect("tempdir");
        let mut cfg = config(&tmp);
        cfg.summary = Some(tmp.path().join("summary.json"));
        write_csv(&cfg.data_dir, "A-bench-heavy_Accelerometer.csv", &[(0, 1.0)]);
        write_csv(&cfg.data_dir, "A-bench-heavy_Gyroscope.csv", &[(0, 1.0)]);

        run_pipeline(&cfg).unwrap();

        let raw = std::fs::read_to_string(tmp.path().join("summary.json")).unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json["resampled_rows"], 1);
        assert_eq!(json["aggregation"]["accelerometer"]["files"], 1);
        assert!(json["timings"]["load_seconds"].is_number());
    }

    #[test]
    fn test_pipeline_preview_and_custom_width() {
        let tmp = TempDir::new().expect("tempdir");
        let mut cfg = config(&tmp);
        cfg.preview = Some(10);
        cfg.bucket_width = TimeDelta::milliseconds(500);
        cfg.timezone = TimezoneHandler::new("Europe/Amsterdam");
        write_csv(&cfg.data_dir, "A-ohp-heavy_Accelerometer.csv", &[(0, 1.0), (1_000, 1.0)]);
        write_csv(&cfg.data_dir, "A-ohp-heavy_Gyroscope.csv", &[(0, 1.0), (1_000, 1.0)]);

        let result = run_pipeline(&cfg).unwrap();

        assert_eq!(result.rows.len(), 2);
        assert_eq!(result.preview.as_ref().map(Vec::len), Some(3));
        assert_eq!(result.metadata.timezone, "Europe/Amsterdam");
    }

    #[test]
    fn test_pipeline_missing_dir_is_error() {
        let tmp = TempDir::new().expect("tempdir");
        let cfg = PipelineConfig::new(tmp.path().join("nope"), tmp.path().join("out.parquet"));

        let err = run_pipeline(&cfg).unwrap_err();
        assert!(matches!(err, PipelineError::DataPathNotFound(_)));
    }

    #[test]
    fn test_pipeline_bad_file_writes_nothing() {
        let tmp = TempDir::new().expect("tempdir");
        let cfg = config(&tmp);
        write_csv(&cfg.data_dir, "A-bench-heavy_Accelerometer.csv", &[(0, 1.0)]);
        std::fs::write(cfg.data_dir.join("A-bench-heavy_Gyroscope.csv"), format!("{}\nabc,t,0,1,1,1\n", HEADER))
            .unwrap();

        let err = run_pipeline(&cfg).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidValue { .. }));
        assert!(!cfg.output.exists());
    }
}
