//! Timestamp alignment of the accelerometer and gyroscope tables.

use barbell_core::error::{PipelineError, Result};
use barbell_core::models::{MergedRow, SensorKind, SensorRow, SensorTable};
use serde::Serialize;
use tracing::{debug, info};

/// Row accounting for one merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MergeStats {
    /// Timestamps both sensors contributed to (= merged rows).
    pub matched: usize,
    /// Accelerometer rows without a gyroscope partner, dropped.
    pub acc_only: usize,
    /// Gyroscope rows without an accelerometer partner, dropped.
    pub gyr_only: usize,
}

impl MergeStats {
    pub fn dropped(&self) -> usize {
        self.acc_only + self.gyr_only
    }
}

/// Merged rows plus what was dropped to get them.
#[derive(Debug, Clone)]
pub struct MergeResult {
    pub rows: Vec<MergedRow>,
    pub stats: MergeStats,
}

/// Join the accelerometer channels with the gyroscope channels and metadata.
///
/// Only timestamps present in both tables produce a row. When one timestamp
/// occurs several times on a side, occurrences pair up positionally in
/// file-processing order and any surplus counts as unmatched. The output is
/// ordered by timestamp.
pub fn merge_streams(acc: &SensorTable, gyr: &SensorTable) -> Result<MergeResult> {
    if acc.kind != SensorKind::Accelerometer || gyr.kind != SensorKind::Gyroscope {
        return Err(PipelineError::Config(format!(
            "merge expects (Accelerometer, Gyroscope) tables, got ({}, {})",
            acc.kind, gyr.kind
        )));
    }

    let acc_sorted = sorted_by_time(&acc.rows);
    let gyr_sorted = sorted_by_time(&gyr.rows);

    let mut rows = Vec::with_capacity(acc_sorted.len().min(gyr_sorted.len()));
    let mut stats = MergeStats::default();
    let (mut i, mut j) = (0usize, 0usize);

    while i < acc_sorted.len() && j < gyr_sorted.len() {
        let ta = acc_sorted[i].timestamp();
        let tg = gyr_sorted[j].timestamp();

        if ta < tg {
            stats.acc_only += 1;
            i += 1;
        } else if tg < ta {
            stats.gyr_only += 1;
            j += 1;
        } else {
            let acc_run = run_length(&acc_sorted[i..]);
            let gyr_run = run_length(&gyr_sorted[j..]);
            let paired = acc_run.min(gyr_run);

            for k in 0..paired {
                rows.push(join_row(acc_sorted[i + k], gyr_sorted[j + k]));
            }
            stats.matched += paired;
            stats.acc_only += acc_run - paired;
            stats.gyr_only += gyr_run - paired;

            i += acc_run;
            j += gyr_run;
        }
    }
    stats.acc_only += acc_sorted.len() - i;
    stats.gyr_only += gyr_sorted.len() - j;

    if stats.dropped() > 0 {
        debug!(
            "Merge dropped {} accelerometer-only and {} gyroscope-only rows",
            stats.acc_only, stats.gyr_only
        );
    }
    info!(
        "Merged {} rows from {} accelerometer and {} gyroscope rows",
        stats.matched,
        acc.len(),
        gyr.len()
    );

    Ok(MergeResult { rows, stats })
}

// ── Internal helpers ──────────────────────────────────────────────────────────

/// Row references ordered by timestamp; stable, so ties keep file order.
fn sorted_by_time(rows: &[SensorRow]) -> Vec<&SensorRow> {
    let mut sorted: Vec<&SensorRow> = rows.iter().collect();
    sorted.sort_by_key(|r| r.timestamp());
    sorted
}

/// Number of leading rows sharing the first row's timestamp.
fn run_length(rows: &[&SensorRow]) -> usize {
    match rows.first() {
        Some(first) => rows
            .iter()
            .take_while(|r| r.timestamp() == first.timestamp())
            .count(),
        None => 0,
    }
}

/// Metadata always comes from the gyroscope row.
fn join_row(acc: &SensorRow, gyr: &SensorRow) -> MergedRow {
    MergedRow {
        timestamp: acc.timestamp(),
        acc_x: acc.reading.x,
        acc_y: acc.reading.y,
        acc_z: acc.reading.z,
        gyr_x: gyr.reading.x,
        gyr_y: gyr.reading.y,
        gyr_z: gyr.reading.z,
        participant: gyr.participant.clone(),
        label: gyr.label.clone(),
        category: gyr.category.clone(),
        set: gyr.set,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
