//! Fixed-interval resampling of the merged sensor table.
//!
//! Rows are first split by calendar day so that no bucket ever spans the idle
//! gap between two recording days. Within a day every row falls into the
//! bucket starting at `floor(timestamp / width) * width` of its own set, so
//! two sessions meeting inside one window produce two rows. Inertial channels
//! are averaged, metadata takes the last value seen in the bucket. Buckets
//! nobody fell into are never emitted.

use std::collections::BTreeMap;

use barbell_core::models::{MergedRow, ResampledRow};
use barbell_core::settings::PipelineConfig;
use barbell_core::time_utils::{bucket_start, TimezoneHandler, DEFAULT_BUCKET_MS};
use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

/// Upper bound on grid cells produced by [`Resampler::preview`].
pub const MAX_PREVIEW_BUCKETS: usize = 100_000;

// ── BucketAccumulator ─────────────────────────────────────────────────────────

/// Running aggregate of one bucket.
#[derive(Debug, Clone, Default)]
struct BucketAccumulator {
    sums: [f64; 6],
    count: usize,
    participant: String,
    label: String,
    category: String,
    set: u32,
}

impl BucketAccumulator {
    fn add(&mut self, row: &MergedRow) {
        for (sum, value) in self.sums.iter_mut().zip(row.channels()) {
            *sum += value;
        }
        self.count += 1;

        // Last non-missing value wins.
        replace_if_present(&mut self.participant, &row.participant);
        replace_if_present(&mut self.label, &row.label);
        replace_if_present(&mut self.category, &row.category);
        self.set = row.set;
    }

    fn means(&self) -> [f64; 6] {
        let n = self.count as f64;
        self.sums.map(|sum| sum / n)
    }

    fn finish(self, timestamp: DateTime<Utc>) -> ResampledRow {
        let [acc_x, acc_y, acc_z, gyr_x, gyr_y, gyr_z] = self.means();
        ResampledRow {
            timestamp,
            acc_x,
            acc_y,
            acc_z,
            gyr_x,
            gyr_y,
            gyr_z,
            participant: self.participant,
            label: self.label,
            category: self.category,
            set: i64::from(self.set),
        }
    }
}

fn replace_if_present(slot: &mut String, value: &str) {
    if !value.is_empty() {
        value.clone_into(slot);
    }
}

// ── Result types ──────────────────────────────────────────────────────────────

/// Buckets produced for one calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayPartition {
    pub date: NaiveDate,
    pub source_rows: usize,
    pub buckets: usize,
}

/// The resampled table and its per-day breakdown.
#[derive(Debug, Clone)]
pub struct ResampleResult {
    pub rows: Vec<ResampledRow>,
    pub days: Vec<DayPartition>,
}

/// One grid cell of the exploratory preview.
///
/// `means` is `None` for buckets no row fell into; metadata is carried
/// forward from the most recent populated bucket.
#[derive(Debug, Clone, PartialEq)]
pub struct PreviewRow {
    pub timestamp: DateTime<Utc>,
    pub means: Option<[f64; 6]>,
    pub participant: String,
    pub label: String,
    pub category: String,
    pub set: i64,
}

// ── Resampler ─────────────────────────────────────────────────────────────────

/// Converts irregular merged rows into a fixed-width, day-partitioned grid.
#[derive(Debug, Clone, Copy)]
pub struct Resampler {
    width: TimeDelta,
    timezone: TimezoneHandler,
}

impl Default for Resampler {
    fn default() -> Self {
        Self::new(TimeDelta::milliseconds(DEFAULT_BUCKET_MS), TimezoneHandler::utc())
    }
}

impl Resampler {
    /// `width` must already be validated with
    /// [`bucket_width`](barbell_core::time_utils::bucket_width).
    pub fn new(width: TimeDelta, timezone: TimezoneHandler) -> Self {
        Self { width, timezone }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.bucket_width, config.timezone)
    }

    /// Resample `rows` day by day and concatenate the days in date order.
    ///
    /// `rows` are taken in arrival order; "last" metadata means last in that
    /// order within a bucket.
    pub fn resample(&self, rows: &[MergedRow]) -> ResampleResult {
        let mut output = Vec::new();
        let mut days = Vec::new();

        for (date, day_rows) in self.partition_by_day(rows) {
            let day_output = self.resample_day(&day_rows);
            debug!(
                "Day {}: {} rows -> {} buckets",
                date,
                day_rows.len(),
                day_output.len()
            );
            days.push(DayPartition {
                date,
                source_rows: day_rows.len(),
                buckets: day_output.len(),
            });
            output.extend(day_output);
        }

        info!(
            "Resampled {} merged rows into {} buckets of {} ms across {} days",
            rows.len(),
            output.len(),
            self.width.num_milliseconds(),
            days.len()
        );

        ResampleResult { rows: output, days }
    }

    /// Diagnostic resample of the first `limit` rows.
    ///
    /// Channels are averaged per bucket, metadata is forward-filled over the
    /// full grid (empty buckets included) and days are not separated. This
    /// is only a quick look at the data; [`Resampler::resample`] is the
    /// authoritative output.
    pub fn preview(&self, rows: &[MergedRow], limit: usize) -> Vec<PreviewRow> {
        let head = &rows[..limit.min(rows.len())];

        let mut buckets: BTreeMap<DateTime<Utc>, BucketAccumulator> = BTreeMap::new();
        for row in head {
            buckets
                .entry(bucket_start(row.timestamp, self.width))
                .or_default()
                .add(row);
        }

        let (Some(&first), Some(&last)) = (buckets.keys().next(), buckets.keys().next_back())
        else {
            return Vec::new();
        };

        let mut preview = Vec::new();
        let mut carried: Option<(String, String, String, i64)> = None;
        let mut cursor = first;

        while cursor <= last {
            if preview.len() >= MAX_PREVIEW_BUCKETS {
                warn!(
                    "Preview truncated at {} buckets; the previewed rows span {}",
                    MAX_PREVIEW_BUCKETS,
                    last - first
                );
                break;
            }

            let means = match buckets.get(&cursor) {
                Some(acc) => {
                    carried = Some((
                        acc.participant.clone(),
                        acc.label.clone(),
                        acc.category.clone(),
                        i64::from(acc.set),
                    ));
                    Some(acc.means())
                }
                None => None,
            };

            // The first cell is always populated, so `carried` is set here.
            if let Some((participant, label, category, set)) = carried.clone() {
                preview.push(PreviewRow {
                    timestamp: cursor,
                    means,
                    participant,
                    label,
                    category,
                    set,
                });
            }
            cursor += self.width;
        }

        preview
    }

    // ── Private ───────────────────────────────────────────────────────────────

    /// Group rows by calendar day, keeping arrival order inside each day.
    fn partition_by_day<'a>(&self, rows: &'a [MergedRow]) -> BTreeMap<NaiveDate, Vec<&'a MergedRow>> {
        let mut days: BTreeMap<NaiveDate, Vec<&MergedRow>> = BTreeMap::new();
        for row in rows {
            days.entry(self.timezone.day_of(row.timestamp))
                .or_default()
                .push(row);
        }
        days
    }

    fn resample_day(&self, rows: &[&MergedRow]) -> Vec<ResampledRow> {
        // Keyed by (start, set) so two sets sharing a window stay apart;
        // BTreeMap keeps buckets in time order and only touched buckets exist.
        let mut buckets: BTreeMap<(DateTime<Utc>, u32), BucketAccumulator> = BTreeMap::new();
        for row in rows {
            buckets
                .entry((bucket_start(row.timestamp, self.width), row.set))
                .or_default()
                .add(row);
        }

        buckets
            .into_iter()
            .map(|((start, _), acc)| acc.finish(start))
            .collect()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use barbell_core::time_utils::from_epoch_millis;
    use chrono::TimeZone;

    const DAY_MS: i64 = 24 * 60 * 60 * 1000;

    fn row(ms: i64, acc_x: f64, label: &str, set: u32) -> MergedRow {
        MergedRow {
            timestamp: from_epoch_millis(ms).unwrap(),
            acc_x,
            acc_y: 1.0,
            acc_z: 1.0,
            gyr_x: 2.0,
            gyr_y: 2.0,
            gyr_z: 2.0,
            participant: "A".to_string(),
            label: label.to_string(),
            category: "heavy".to_string(),
            set,
        }
    }

    fn at(ms: i64) -> DateTime<Utc> {
        from_epoch_millis(ms).unwrap()
    }

    // ── resample ──────────────────────────────────────────────────────────────

    #[test]
    fn test_resample_mean_of_numeric_channels() {
        let rows = vec![row(0, 1.0, "bench", 1), row(80, 2.0, "bench", 1), row(160, 3.0, "bench", 1)];
        let result = Resampler::default().resample(&rows);

        assert_eq!(result.rows.len(), 1);
        assert_eq!(result.rows[0].acc_x, 2.0);
        assert_eq!(result.rows[0].gyr_z, 2.0);
    }

    #[test]
    fn test_resample_metadata_takes_last() {
        let rows = vec![row(0, 0.0, "A", 1), row(50, 0.0, "A", 1), row(100, 0.0, "B", 1)];
        let result = Resampler::default().resample(&rows);

        assert_eq!(result.rows.len(), 1);
        assert_eq!(result.rows[0].label, "B");
        assert_eq!(result.rows[0].set, 1);
    }

    #[test]
    fn test_resample_sets_sharing_a_window_stay_apart() {
        let rows = vec![
            row(0, 1.0, "bench", 1),
            row(40, 1.0, "bench", 1),
            row(120, 9.0, "squat", 2),
            row(160, 9.0, "squat", 2),
        ];
        let result = Resampler::default().resample(&rows);

        assert_eq!(result.rows.len(), 2);
        assert_eq!(result.days[0].buckets, 2);
        for (bucket, (label, set, acc_x)) in result.rows.iter().zip([("bench", 1, 1.0), ("squat", 2, 9.0)]) {
            assert_eq!(bucket.timestamp, at(0));
            assert_eq!(bucket.label, label);
            assert_eq!(bucket.set, set);
            assert_eq!(bucket.acc_x, acc_x);
        }
    }

    #[test]
    fn test_resample_last_skips_missing_metadata() {
        let mut blank = row(100, 0.0, "", 1);
        blank.category = String::new();
        let rows = vec![row(0, 0.0, "squat", 1), blank];

        let result = Resampler::default().resample(&rows);
        assert_eq!(result.rows[0].label, "squat");
        assert_eq!(result.rows[0].category, "heavy");
    }

    #[test]
    fn test_resample_bucket_edges() {
        let rows = vec![row(0, 1.0, "bench", 1), row(199, 3.0, "bench", 1), row(200, 10.0, "bench", 1)];
        let result = Resampler::default().resample(&rows);

        assert_eq!(result.rows.len(), 2);
        assert_eq!(result.rows[0].timestamp, at(0));
        assert_eq!(result.rows[0].acc_x, 2.0);
        assert_eq!(result.rows[1].timestamp, at(200));
        assert_eq!(result.rows[1].acc_x, 10.0);
    }

    #[test]
    fn test_resample_skips_empty_buckets() {
        // Two readings 10 s apart: the 49 buckets between them must not appear.
        let rows = vec![row(0, 1.0, "bench", 1), row(10_000, 1.0, "bench", 1)];
        let result = Resampler::default().resample(&rows);

        let times: Vec<DateTime<Utc>> = result.rows.iter().map(|r| r.timestamp).collect();
        assert_eq!(times, vec![at(0), at(10_000)]);
    }

    #[test]
    fn test_resample_two_days_never_bridge_gap() {
        let day1_end = DAY_MS - 100;
        let day2_start = DAY_MS + 6 * 60 * 60 * 1000;
        let rows = vec![
            row(day1_end - 100, 1.0, "bench", 1),
            row(day1_end, 3.0, "bench", 1),
            row(day2_start, 5.0, "squat", 2),
            row(day2_start + 40, 7.0, "squat", 2),
        ];

        let result = Resampler::default().resample(&rows);

        assert_eq!(result.days.len(), 2);
        assert_eq!(result.days[0].date, NaiveDate::from_ymd_opt(1970, 1, 1).unwrap());
        assert_eq!(result.days[1].date, NaiveDate::from_ymd_opt(1970, 1, 2).unwrap());
        for bucket in &result.rows {
            let end = bucket.timestamp + TimeDelta::milliseconds(200);
            let handler = TimezoneHandler::utc();
            assert_eq!(
                handler.day_of(bucket.timestamp),
                handler.day_of(end - TimeDelta::milliseconds(1))
            );
        }
        // Day 1 buckets only hold day 1 values, day 2 only day 2 values.
        assert!(result.rows.iter().all(|r| (r.label == "bench") == (r.acc_x < 4.0)));
        assert_eq!(result.rows.last().unwrap().acc_x, 6.0);
    }

    #[test]
    fn test_resample_days_concatenated_in_date_order() {
        // Input arrives day 2 first (file order), output must start with day 1.
        let rows = vec![row(DAY_MS + 500, 9.0, "squat", 2), row(500, 1.0, "bench", 1)];
        let result = Resampler::default().resample(&rows);

        assert_eq!(result.rows[0].label, "bench");
        assert_eq!(result.rows[1].label, "squat");
    }

    #[test]
    fn test_resample_day_split_uses_timezone() {
        // 23:00 and 23:30 UTC on Jan 11 fall on different Amsterdam days.
        let t1 = Utc.with_ymd_and_hms(2019, 1, 11, 22, 59, 59).unwrap();
        let t2 = Utc.with_ymd_and_hms(2019, 1, 11, 23, 0, 0).unwrap();
        let rows = vec![
            row(t1.timestamp_millis(), 1.0, "bench", 1),
            row(t2.timestamp_millis(), 1.0, "bench", 1),
        ];

        let utc = Resampler::default().resample(&rows);
        let ams = Resampler::new(TimeDelta::milliseconds(200), TimezoneHandler::new("Europe/Amsterdam"))
            .resample(&rows);

        assert_eq!(utc.days.len(), 1);
        assert_eq!(ams.days.len(), 2);
    }

    #[test]
    fn test_resample_set_is_integer() {
        let rows = vec![row(0, 0.0, "bench", 3), row(40, 0.0, "bench", 3)];
        let result = Resampler::default().resample(&rows);
        let set: i64 = result.rows[0].set;
        assert_eq!(set, 3);
    }

    #[test]
    fn test_resample_empty_input() {
        let result = Resampler::default().resample(&[]);
        assert!(result.rows.is_empty());
        assert!(result.days.is_empty());
    }

    #[test]
    fn test_resample_custom_width() {
        let rows = vec![row(0, 1.0, "bench", 1), row(300, 3.0, "bench", 1), row(600, 5.0, "bench", 1)];
        let result = Resampler::new(TimeDelta::milliseconds(500), TimezoneHandler::utc()).resample(&rows);

        assert_eq!(result.rows.len(), 2);
        assert_eq!(result.rows[0].acc_x, 2.0);
        assert_eq!(result.rows[1].timestamp, at(500));
    }

    #[test]
    fn test_day_partition_counts() {
        let rows = vec![row(0, 0.0, "bench", 1), row(40, 0.0, "bench", 1), row(400, 0.0, "bench", 1)];
        let result = Resampler::default().resample(&rows);
        assert_eq!(
            result.days,
            vec![DayPartition {
                date: NaiveDate::from_ymd_opt(1970, 1, 1).unwrap(),
                source_rows: 3,
                buckets: 2,
            }]
        );
    }

    // ── preview ───────────────────────────────────────────────────────────────

    #[test]
    fn test_preview_fills_grid_and_forward_fills_metadata() {
        let rows = vec![row(0, 1.0, "bench", 1), row(600, 3.0, "squat", 2)];
        let preview = Resampler::default().preview(&rows, 1000);

        let times: Vec<DateTime<Utc>> = preview.iter().map(|p| p.timestamp).collect();
        assert_eq!(times, vec![at(0), at(200), at(400), at(600)]);
        assert!(preview[1].means.is_none());
        assert_eq!(preview[1].label, "bench");
        assert_eq!(preview[3].label, "squat");
        assert_eq!(preview[3].means.unwrap()[0], 3.0);
    }

    #[test]
    fn test_preview_respects_limit() {
        let rows = vec![row(0, 1.0, "bench", 1), row(200, 1.0, "bench", 1), row(400, 1.0, "bench", 1)];
        let preview = Resampler::default().preview(&rows, 2);
        assert_eq!(preview.len(), 2);
    }

    #[test]
    fn test_preview_empty() {
        assert!(Resampler::default().preview(&[], 10).is_empty());
        assert!(Resampler::default().preview(&[row(0, 0.0, "bench", 1)], 0).is_empty());
    }

    #[test]
    fn test_preview_truncates_huge_grid() {
        let rows = vec![row(0, 1.0, "bench", 1), row(DAY_MS, 1.0, "bench", 1)];
        let preview = Resampler::default().preview(&rows, 10);
        assert_eq!(preview.len(), MAX_PREVIEW_BUCKETS);
    }
}
