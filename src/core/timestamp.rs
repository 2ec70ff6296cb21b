//! SQL timestamp helpers
//!
//! Timestamps travel as `YYYY-MM-DD HH:MM:SS` strings and are always read as
//! UTC. Only instants whose wire form has a four-digit year are accepted, so
//! every accepted value formats and parses back to itself.

use super::error::{MapperError, Result};
use super::value::DatabaseValue;
use chrono::{DateTime, NaiveDateTime, SubsecRound, TimeZone, Utc};

/// Wire format of persisted timestamps
pub const SQL_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// `0000-01-01 00:00:00` as Unix seconds
pub const MIN_TIMESTAMP: i64 = -62_167_219_200;

/// `9999-12-31 23:59:59` as Unix seconds
pub const MAX_TIMESTAMP: i64 = 253_402_300_799;

/// Current Unix timestamp in seconds
pub fn now() -> i64 {
    Utc::now().timestamp()
}

/// Current instant truncated to whole seconds
pub(crate) fn now_utc() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(0)
}

/// Instant for Unix seconds, `None` outside the wire range
pub fn to_datetime(timestamp: i64) -> Option<DateTime<Utc>> {
    if !(MIN_TIMESTAMP..=MAX_TIMESTAMP).contains(&timestamp) {
        return None;
    }
    DateTime::<Utc>::from_timestamp(timestamp, 0)
}

/// Parse a `YYYY-MM-DD HH:MM:SS` string as UTC
///
/// Returns `None` for anything that does not match the wire format.
pub fn parse(value: &str) -> Option<i64> {
    NaiveDateTime::parse_from_str(value.trim(), SQL_FORMAT)
        .ok()
        .map(|naive| naive.and_utc().timestamp())
        .filter(|ts| (MIN_TIMESTAMP..=MAX_TIMESTAMP).contains(ts))
}

/// Format Unix seconds in the wire format, `None` outside the wire range
pub fn format(timestamp: i64) -> Option<String> {
    to_datetime(timestamp).map(|date| format_date(&date))
}

/// Format an instant in the wire format (UTC)
pub fn format_date<Tz: TimeZone>(date: &DateTime<Tz>) -> String {
    date.with_timezone(&Utc).format(SQL_FORMAT).to_string()
}

/// Read a timestamp from a payload value
///
/// Accepts a wire-format string or integer seconds within the wire range.
///
/// # Errors
///
/// Returns a validation error naming `field` for any other value.
pub fn timestamp_from(entity: &str, field: &str, value: &DatabaseValue) -> Result<DateTime<Utc>> {
    let seconds = match value {
        DatabaseValue::Long(v) => *v,
        DatabaseValue::Int(v) => i64::from(*v),
        DatabaseValue::String(s) => parse(s).ok_or_else(|| {
            MapperError::invalid_field(entity, field, format!("Invalid date/time string '{}'", s))
        })?,
        other => {
            return Err(MapperError::invalid_field(
                entity,
                field,
                format!("Invalid date/time value of type {}", other.type_name()),
            ))
        }
    };
    to_datetime(seconds).ok_or_else(|| {
        MapperError::invalid_field(
            entity,
            field,
            format!("Date/time {} is out of range", seconds),
        )
    })
}

/// Convert Unix seconds to a date in the given time zone
///
/// `None` outside the wire range.
pub fn date_from<Tz: TimeZone>(timestamp: i64, tz: &Tz) -> Option<DateTime<Tz>> {
    to_datetime(timestamp).map(|utc| utc.with_timezone(tz))
}
