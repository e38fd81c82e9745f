use chrono::{DateTime, Utc};

use crate::config::{DEFAULT_LIVE_WINDOW, DEFAULT_RANGE, RangeParams};
use crate::error::{AppError, Result};
use jevons_core::TimeRange;
use jevons_store::{DAY_SECONDS, HOUR_SECONDS};

pub use jevons_store::tsv::iso_from_epoch;

/// Symbolic ranges accepted by the query surface, in display order.
pub const RANGE_CHOICES: [(&str, i64); 10] = [
    ("1h", HOUR_SECONDS),
    ("3h", 3 * HOUR_SECONDS),
    ("6h", 6 * HOUR_SECONDS),
    ("12h", 12 * HOUR_SECONDS),
    ("24h", DAY_SECONDS),
    ("30h", 30 * HOUR_SECONDS),
    ("48h", 2 * DAY_SECONDS),
    ("7d", 7 * DAY_SECONDS),
    ("14d", 14 * DAY_SECONDS),
    ("30d", 30 * DAY_SECONDS),
];

pub const LIVE_WINDOW_CHOICES: [(&str, i64); 6] = [
    ("15m", 15 * 60),
    ("30m", 30 * 60),
    ("1h", HOUR_SECONDS),
    ("3h", 3 * HOUR_SECONDS),
    ("6h", 6 * HOUR_SECONDS),
    ("24h", DAY_SECONDS),
];

/// Source of "now" for range resolution.
pub trait Clock: Send + Sync {
    fn now(&self) -> i64;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        Utc::now().timestamp()
    }
}

#[derive(Clone, Copy, Debug)]
pub struct FixedClock(pub i64);

impl Clock for FixedClock {
    fn now(&self) -> i64 {
        self.0
    }
}

pub fn window_seconds(label: &str) -> Option<i64> {
    RANGE_CHOICES
        .iter()
        .find(|(name, _)| *name == label)
        .map(|(_, secs)| *secs)
}

pub fn live_window_seconds(label: Option<&str>) -> Result<i64> {
    let label = label.unwrap_or(DEFAULT_LIVE_WINDOW);
    LIVE_WINDOW_CHOICES
        .iter()
        .find(|(name, _)| *name == label)
        .map(|(_, secs)| *secs)
        .ok_or_else(|| AppError::InvalidInput(format!("unsupported live window {}", label)))
}

/// Widest explicit bucket accepted from clients.
pub const MAX_BUCKET_SECONDS: i64 = 366 * DAY_SECONDS;

/// Accepts epoch seconds or an RFC 3339 timestamp. Epochs outside the
/// calendar range chrono can represent are rejected.
pub fn parse_instant(value: &str) -> Result<i64> {
    let value = value.trim();
    if let Ok(epoch) = value.parse::<i64>() {
        return DateTime::<Utc>::from_timestamp(epoch, 0)
            .map(|_| epoch)
            .ok_or_else(|| AppError::InvalidInput(format!("epoch {} is out of range", value)));
    }
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.timestamp())
        .map_err(|err| AppError::InvalidInput(format!("invalid datetime {}: {}", value, err)))
}

/// Resolves client range parameters against `now`. Explicit bounds win over a
/// symbolic window; symbolic windows have no upper bound.
pub fn resolve_range(params: &RangeParams, now: i64) -> Result<TimeRange> {
    let start = params.start.as_deref().map(parse_instant).transpose()?;
    let end = params.end.as_deref().map(parse_instant).transpose()?;
    if start.is_some() || end.is_some() {
        if let (Some(start), Some(end)) = (start, end)
            && start >= end
        {
            return Err(AppError::InvalidInput(format!(
                "range start {} must be before end {}",
                start, end
            )));
        }
        return Ok(TimeRange { start, end });
    }
    match params.range.as_deref().unwrap_or(DEFAULT_RANGE) {
        "all" => Ok(TimeRange::all()),
        label => window_seconds(label)
            .map(|secs| TimeRange::since(now - secs))
            .ok_or_else(|| AppError::InvalidInput(format!("unsupported range {}", label))),
    }
}

/// `hour`, `day`, or a positive number of seconds up to [`MAX_BUCKET_SECONDS`].
pub fn parse_bucket(value: &str) -> Result<i64> {
    match value.trim() {
        "hour" => Ok(HOUR_SECONDS),
        "day" => Ok(DAY_SECONDS),
        other => match other.parse::<i64>() {
            Ok(secs) if secs > 0 && secs <= MAX_BUCKET_SECONDS => Ok(secs),
            _ => Err(AppError::InvalidInput(format!("unsupported bucket {}", other))),
        },
    }
}
