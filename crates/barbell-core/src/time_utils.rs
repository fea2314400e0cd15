use chrono::{DateTime, DurationRound, NaiveDate, TimeDelta, Utc};
use chrono_tz::Tz;
use tracing::warn;

use crate::error::{PipelineError, Result};

/// Default resampling bucket width in milliseconds.
pub const DEFAULT_BUCKET_MS: i64 = 200;

const MILLIS_PER_MINUTE: i64 = 60_000;

// ── Epoch conversion ──────────────────────────────────────────────────────────

/// Convert raw epoch milliseconds into a UTC [`DateTime`].
///
/// Returns `None` when the value is outside chrono's representable range.
pub fn from_epoch_millis(ms: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms)
}

// ── Buckets ───────────────────────────────────────────────────────────────────

/// Validate a bucket width and turn it into a [`TimeDelta`].
///
/// The width must be positive and divide one minute evenly, so that bucket
/// edges coincide with day boundaries in every timezone.
pub fn bucket_width(width_ms: i64) -> Result<TimeDelta> {
    if width_ms <= 0 {
        return Err(PipelineError::Config(format!(
            "bucket width must be positive, got {} ms",
            width_ms
        )));
    }
    if MILLIS_PER_MINUTE % width_ms != 0 {
        return Err(PipelineError::Config(format!(
            "bucket width must divide one minute evenly, got {} ms",
            width_ms
        )));
    }
    Ok(TimeDelta::milliseconds(width_ms))
}

/// Round `ts` down to the start of its bucket (grid anchored at the Unix epoch).
pub fn bucket_start(ts: DateTime<Utc>, width: TimeDelta) -> DateTime<Utc> {
    ts.duration_trunc(width).unwrap_or(ts)
}

// ── TimezoneHandler ───────────────────────────────────────────────────────────

/// Maps UTC timestamps onto calendar days of a configured timezone.
#[derive(Debug, Clone, Copy)]
pub struct TimezoneHandler {
    tz: Tz,
}

impl TimezoneHandler {
    /// Create a handler for the given IANA timezone name.
    ///
    /// If `tz_name` is not a recognised IANA timezone, falls back to UTC
    /// and logs a warning.
    pub fn new(tz_name: &str) -> Self {
        let tz = tz_name.parse::<Tz>().unwrap_or_else(|_| {
            warn!(
                "TimezoneHandler: unrecognised timezone \"{}\", falling back to UTC",
                tz_name
            );
            Tz::UTC
        });
        Self { tz }
    }

    pub fn utc() -> Self {
        Self { tz: Tz::UTC }
    }

    /// Validate that `tz_name` is a recognised IANA timezone identifier.
    pub fn validate_timezone(tz_name: &str) -> bool {
        tz_name.parse::<Tz>().is_ok()
    }

    /// Calendar date of `ts` in the handler's timezone.
    pub fn day_of(&self, ts: DateTime<Utc>) -> NaiveDate {
        ts.with_timezone(&self.tz).date_naive()
    }

    pub fn tz(&self) -> Tz {
        self.tz
    }
}

impl Default for TimezoneHandler {
    fn default() -> Self {
        Self::utc()
    }
}
