//! Persistence of the resampled table.
//!
//! The table is written as a single Parquet file with one column per field
//! of [`ResampledRow`], in [`COLUMNS`] order, preceded by the bucket
//! timestamp. Every column is non-nullable.

use std::fs::{self, File};
use std::path::Path;
use std::sync::Arc;

use arrow::array::*;
use arrow::datatypes::{DataType, Field, Schema, SchemaRef, TimeUnit};
use arrow::record_batch::RecordBatch;
use barbell_core::error::{PipelineError, Result};
use barbell_core::models::{ResampledRow, COLUMNS};
use barbell_core::time_utils::from_epoch_millis;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use serde::Serialize;
use tracing::{debug, info};

/// Name of the timestamp column.
pub const TIMESTAMP_COLUMN: &str = "timestamp";

const TIMEZONE: &str = "UTC";

/// Arrow schema of the exported table.
pub fn resampled_schema() -> SchemaRef {
    let mut fields = vec![Field::new(
        TIMESTAMP_COLUMN,
        DataType::Timestamp(TimeUnit::Millisecond, Some(TIMEZONE.into())),
        false,
    )];
    fields.extend(COLUMNS.iter().map(|&name| {
        let data_type = match name {
            "participant" | "label" | "category" => DataType::Utf8,
            "set" => DataType::Int64,
            _ => DataType::Float64,
        };
        Field::new(name, data_type, false)
    }));
    Arc::new(Schema::new(fields))
}

// ── Write ─────────────────────────────────────────────────────────────────────

/// Write `rows` to `path` as ZSTD-compressed Parquet.
///
/// The file is written next to `path` first and renamed into place, so a
/// failed run never leaves a truncated table behind. The temporary file is
/// removed again when any step fails. Parent directories are created as
/// needed.
pub fn write_parquet(path: &Path, rows: &[ResampledRow]) -> Result<()> {
    let batch = rows_to_batch(rows)?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let temp_path = path.with_extension("parquet.tmp");

    let written = write_batch(&temp_path, &batch).and_then(|()| Ok(fs::rename(&temp_path, path)?));
    if let Err(e) = written {
        if let Err(cleanup) = fs::remove_file(&temp_path) {
            debug!("Could not remove {}: {}", temp_path.display(), cleanup);
        }
        return Err(e);
    }

    info!("Wrote {} resampled rows to {}", rows.len(), path.display());
    Ok(())
}

fn write_batch(path: &Path, batch: &RecordBatch) -> Result<()> {
    let file = File::create(path)?;

    let props = WriterProperties::builder()
        .set_compression(Compression::ZSTD(Default::default()))
        .build();

    let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))
        .map_err(|e| PipelineError::Export(format!("Failed to create Parquet writer: {}", e)))?;
    writer
        .write(batch)
        .map_err(|e| PipelineError::Export(format!("Failed to write batch: {}", e)))?;
    writer
        .close()
        .map_err(|e| PipelineError::Export(format!("Failed to close writer: {}", e)))?;
    Ok(())
}

fn rows_to_batch(rows: &[ResampledRow]) -> Result<RecordBatch> {
    let timestamp = TimestampMillisecondArray::from(
        rows.iter()
            .map(|r| r.timestamp.timestamp_millis())
            .collect::<Vec<_>>(),
    )
    .with_timezone(TIMEZONE);
    let acc_x: Float64Array = rows.iter().map(|r| r.acc_x).collect::<Vec<_>>().into();
    let acc_y: Float64Array = rows.iter().map(|r| r.acc_y).collect::<Vec<_>>().into();
    let acc_z: Float64Array = rows.iter().map(|r| r.acc_z).collect::<Vec<_>>().into();
    let gyr_x: Float64Array = rows.iter().map(|r| r.gyr_x).collect::<Vec<_>>().into();
    let gyr_y: Float64Array = rows.iter().map(|r| r.gyr_y).collect::<Vec<_>>().into();
    let gyr_z: Float64Array = rows.iter().map(|r| r.gyr_z).collect::<Vec<_>>().into();
    let participant: StringArray = rows.iter().map(|r| r.participant.as_str()).collect::<Vec<_>>().into();
    let label: StringArray = rows.iter().map(|r| r.label.as_str()).collect::<Vec<_>>().into();
    let category: StringArray = rows.iter().map(|r| r.category.as_str()).collect::<Vec<_>>().into();
    let set: Int64Array = rows.iter().map(|r| r.set).collect::<Vec<_>>().into();

    RecordBatch::try_new(
        resampled_schema(),
        vec![
            Arc::new(timestamp),
            Arc::new(acc_x),
            Arc::new(acc_y),
            Arc::new(acc_z),
            Arc::new(gyr_x),
            Arc::new(gyr_y),
            Arc::new(gyr_z),
            Arc::new(participant),
            Arc::new(label),
            Arc::new(category),
            Arc::new(set),
        ],
    )
    .map_err(|e| PipelineError::Export(format!("Failed to create record batch: {}", e)))
}

// ── Read ──────────────────────────────────────────────────────────────────────

/// Load a table written by [`write_parquet`].
pub fn read_parquet(path: &Path) -> Result<Vec<ResampledRow>> {
    let file = File::open(path).map_err(|source| PipelineError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;

    let reader = ParquetRecordBatchReaderBuilder::try_new(file)
        .map_err(|e| PipelineError::Export(format!("Failed to create reader: {}", e)))?
        .build()
        .map_err(|e| PipelineError::Export(format!("Failed to build reader: {}", e)))?;

    let mut rows = Vec::new();
    for batch in reader {
        let batch =
            batch.map_err(|e| PipelineError::Export(format!("Failed to read batch: {}", e)))?;
        rows.extend(batch_to_rows(&batch)?);
    }

    debug!("Read {} resampled rows from {}", rows.len(), path.display());
    Ok(rows)
}

fn column<'a, T: 'static>(batch: &'a RecordBatch, name: &str) -> Result<&'a T> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<T>())
        .ok_or_else(|| PipelineError::Export(format!("column \"{}\" missing or mistyped", name)))
}

fn batch_to_rows(batch: &RecordBatch) -> Result<Vec<ResampledRow>> {
    let timestamp = column::<TimestampMillisecondArray>(batch, TIMESTAMP_COLUMN)?;
    let acc_x = column::<Float64Array>(batch, "acc_x")?;
    let acc_y = column::<Float64Array>(batch, "acc_y")?;
    let acc_z = column::<Float64Array>(batch, "acc_z")?;
    let gyr_x = column::<Float64Array>(batch, "gyr_x")?;
    let gyr_y = column::<Float64Array>(batch, "gyr_y")?;
    let gyr_z = column::<Float64Array>(batch, "gyr_z")?;
    let participant = column::<StringArray>(batch, "participant")?;
    let label = column::<StringArray>(batch, "label")?;
    let category = column::<StringArray>(batch, "category")?;
    let set = column::<Int64Array>(batch, "set")?;

    (0..batch.num_rows())
        .map(|i| {
            let ms = timestamp.value(i);
            let timestamp = from_epoch_millis(ms).ok_or_else(|| {
                PipelineError::Export(format!("timestamp {} ms out of range", ms))
            })?;
            Ok(ResampledRow {
                timestamp,
                acc_x: acc_x.value(i),
                acc_y: acc_y.value(i),
                acc_z: acc_z.value(i),
                gyr_x: gyr_x.value(i),
                gyr_y: gyr_y.value(i),
                gyr_z: gyr_z.value(i),
                participant: participant.value(i).to_string(),
                label: label.value(i).to_string(),
                category: category.value(i).to_string(),
                set: set.value(i),
            })
        })
        .collect()
}

// ── Summary ───────────────────────────────────────────────────────────────────

/// Atomically write a pretty-printed JSON summary to `path`.
pub fn write_summary<T: Serialize>(path: &Path, summary: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(summary)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json)?;
    fs::rename(&tmp, path)?;

    debug!("Wrote run summary to {}", path.display());
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
