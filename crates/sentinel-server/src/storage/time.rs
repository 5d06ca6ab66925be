//! Timestamp rendering and calendar arithmetic for stored unix seconds.

use chrono::{DateTime, Months, NaiveDate, SecondsFormat, Utc};
use serde::Serializer;

fn to_datetime(ts: i64) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(ts, 0)
}

/// ISO-8601 with millisecond precision and a `Z` suffix.
pub fn to_rfc3339(ts: i64) -> String {
    to_datetime(ts).map_or_else(
        || ts.to_string(),
        |dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true),
    )
}

/// Grouping key such as `"March 5, 2025"`, in UTC.
pub fn day_key(ts: i64) -> String {
    to_datetime(ts).map_or_else(|| ts.to_string(), |dt| dt.format("%B %-d, %Y").to_string())
}

/// Same wall-clock time one calendar month later. Day-of-month is clamped
/// to the target month's length (Jan 31 becomes Feb 28/29).
pub fn add_one_month(ts: i64) -> i64 {
    to_datetime(ts)
        .and_then(|dt| dt.checked_add_months(Months::new(1)))
        .map_or(ts, |dt| dt.timestamp())
}

/// Parse a date filter bound: RFC 3339, or a bare `YYYY-MM-DD` which
/// expands to the start of that day (or its last second when `end_of_day`).
pub fn parse_bound(value: &str, end_of_day: bool) -> Option<i64> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.timestamp());
    }
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()?;
    let time = if end_of_day {
        date.and_hms_opt(23, 59, 59)?
    } else {
        date.and_hms_opt(0, 0, 0)?
    };
    Some(time.and_utc().timestamp())
}

pub fn serialize<S: Serializer>(ts: &i64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&to_rfc3339(*ts))
}

#[allow(clippy::ref_option)]
pub fn serialize_opt<S: Serializer>(ts: &Option<i64>, serializer: S) -> Result<S::Ok, S::Error> {
    match ts {
        Some(ts) => serializer.serialize_str(&to_rfc3339(*ts)),
        None => serializer.serialize_none(),
    }
}
