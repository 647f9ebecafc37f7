//! Timestamp normalization.
//!
//! Every time value that reaches a series sink goes through [`normalize`] so
//! that history records, realtime messages and signal events share one unit:
//! whole seconds since the Unix epoch.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Deserialize;

use crate::domain::errors::SyncError;

/// A timestamp as it arrives from the backend or the browser.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawTime {
    /// Milliseconds since the epoch, as produced by `Date.now()`.
    Millis(f64),
    Text(String),
    #[serde(skip)]
    Date(DateTime<Utc>),
}

impl From<f64> for RawTime {
    fn from(value: f64) -> Self {
        Self::Millis(value)
    }
}

impl From<&str> for RawTime {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for RawTime {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<DateTime<Utc>> for RawTime {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Date(value)
    }
}

impl From<js_sys::Date> for RawTime {
    fn from(value: js_sys::Date) -> Self {
        Self::Millis(value.get_time())
    }
}

const NAIVE_FORMATS: [&str; 4] =
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"];

/// Convert any supported representation into epoch seconds, flooring
/// sub-second precision.
pub fn normalize(raw: &RawTime) -> Result<i64, SyncError> {
    match raw {
        RawTime::Millis(ms) => millis_to_seconds(*ms),
        RawTime::Date(date) => Ok(date.timestamp()),
        RawTime::Text(text) => parse_text(text.trim()),
    }
}

fn millis_to_seconds(ms: f64) -> Result<i64, SyncError> {
    if !ms.is_finite() {
        return Err(SyncError::InvalidTimeFormat(format!("non-finite epoch value {ms}")));
    }
    let seconds = (ms / 1000.0).floor();
    if seconds.abs() > i64::MAX as f64 {
        return Err(SyncError::InvalidTimeFormat(format!("epoch value {ms} out of range")));
    }
    Ok(seconds as i64)
}

fn parse_text(text: &str) -> Result<i64, SyncError> {
    if let Ok(date) = DateTime::parse_from_rfc3339(text) {
        return Ok(date.timestamp());
    }
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Ok(naive.and_utc().timestamp());
        }
    }
    if let Ok(day) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        if let Some(midnight) = day.and_hms_opt(0, 0, 0) {
            return Ok(midnight.and_utc().timestamp());
        }
    }
    Err(SyncError::InvalidTimeFormat(format!("unrecognised timestamp {text:?}")))
}
