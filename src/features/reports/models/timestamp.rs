//! Timestamp normalisation for report documents.
//!
//! Reports are created by several client generations, so the `timestamp`
//! field arrives in more than one shape: a structured `{seconds, nanoseconds}`
//! pair (also seen serialised with underscore prefixes), an ISO-like string,
//! or a raw millisecond number. Everything normalises to epoch milliseconds;
//! unparseable or absent values normalise to epoch 0, which sorts first in
//! ascending order and last in descending.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde_json::Value;

/// Normalise any observed timestamp shape to epoch milliseconds
pub fn epoch_millis(value: Option<&Value>) -> i64 {
    match value {
        None | Some(Value::Null) => 0,
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or(0),
        Some(Value::String(s)) => parse_datetime(s).unwrap_or(0),
        Some(Value::Object(map)) => {
            let seconds = map
                .get("seconds")
                .or_else(|| map.get("_seconds"))
                .and_then(Value::as_i64);
            let nanoseconds = map
                .get("nanoseconds")
                .or_else(|| map.get("_nanoseconds"))
                .and_then(Value::as_i64)
                .unwrap_or(0);
            match seconds {
                Some(seconds) => seconds * 1000 + nanoseconds / 1_000_000,
                None => 0,
            }
        }
        _ => 0,
    }
}

/// Human-readable rendering for the dashboard table; `None` when the
/// document carries no usable timestamp.
pub fn format_millis(millis: i64) -> Option<String> {
    if millis == 0 {
        return None;
    }
    Utc.timestamp_millis_opt(millis)
        .single()
        .map(|dt| dt.to_rfc3339())
}

fn parse_datetime(s: &str) -> Option<i64> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.timestamp_millis());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(trimmed) {
        return Some(dt.timestamp_millis());
    }
    // Naive shapes without an offset are taken as UTC
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(naive.and_utc().timestamp_millis());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Some(date.and_hms_opt(0, 0, 0)?.and_utc().timestamp_millis());
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn seconds_nanoseconds_pair() {
        let value = json!({ "seconds": 1_700_000_000, "nanoseconds": 0 });
        assert_eq!(epoch_millis(Some(&value)), 1_700_000_000_000);

        let with_nanos = json!({ "seconds": 1_700_000_000, "nanoseconds": 500_000_000 });
        assert_eq!(epoch_millis(Some(&with_nanos)), 1_700_000_000_500);
    }

    #[test]
    fn underscore_prefixed_pair() {
        let value = json!({ "_seconds": 1_700_000_000, "_nanoseconds": 0 });
        assert_eq!(epoch_millis(Some(&value)), 1_700_000_000_000);
    }

    #[test]
    fn iso_string() {
        let value = json!("2024-01-01T00:00:00Z");
        assert_eq!(epoch_millis(Some(&value)), 1_704_067_200_000);
    }

    #[test]
    fn naive_string_is_utc() {
        let value = json!("2024-01-01 00:00:00");
        assert_eq!(epoch_millis(Some(&value)), 1_704_067_200_000);
    }

    #[test]
    fn raw_millis_number() {
        let value = json!(1_700_000_000_000_i64);
        assert_eq!(epoch_millis(Some(&value)), 1_700_000_000_000);
    }

    #[test]
    fn null_and_absent_normalise_to_zero() {
        assert_eq!(epoch_millis(None), 0);
        assert_eq!(epoch_millis(Some(&Value::Null)), 0);
    }

    #[test]
    fn garbage_normalises_to_zero() {
        assert_eq!(epoch_millis(Some(&json!("not a date"))), 0);
        assert_eq!(epoch_millis(Some(&json!({ "weird": true }))), 0);
        assert_eq!(epoch_millis(Some(&json!([1, 2, 3]))), 0);
    }

    #[test]
    fn format_millis_round_trip() {
        assert_eq!(
            format_millis(1_704_067_200_000).as_deref(),
            Some("2024-01-01T00:00:00+00:00")
        );
        assert_eq!(format_millis(0), None);
    }
}
