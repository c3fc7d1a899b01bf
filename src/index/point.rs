//! Order-preserving keys for numeric and temporal values.
//!
//! Numbers and instants are stored as `u64` keys whose unsigned ordering
//! matches the natural ordering of the value, so a `BTreeMap` range scan
//! compares in the declared type rather than lexicographically.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

pub type PointKey = u64;

const SIGN_BIT: u64 = 1 << 63;

pub fn number_key(value: f64) -> PointKey {
    // -0.0 and 0.0 must share a key
    let value = if value == 0.0 { 0.0 } else { value };
    let bits = value.to_bits();
    if bits & SIGN_BIT != 0 {
        !bits
    } else {
        bits | SIGN_BIT
    }
}

pub fn date_key(instant: &DateTime<Utc>) -> PointKey {
    (instant.timestamp_millis() as u64) ^ SIGN_BIT
}

/// Finite numbers only
pub fn parse_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatePrecision {
    Instant,
    Day,
}

/// Accepts RFC 3339, `YYYY-MM-DDTHH:MM:SS[.fff]` (read as UTC) and `YYYY-MM-DD`
pub fn parse_date(raw: &str) -> Option<(DateTime<Utc>, DatePrecision)> {
    let raw = raw.trim();

    if let Ok(instant) = DateTime::parse_from_rfc3339(raw) {
        return Some((instant.with_timezone(&Utc), DatePrecision::Instant));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some((Utc.from_utc_datetime(&naive), DatePrecision::Instant));
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| (Utc.from_utc_datetime(&naive), DatePrecision::Day))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_keys_preserve_order() {
        let values = [-1e9, -100.0, -1.5, -0.0, 0.0, 0.25, 9.0, 10.0, 100.0, 1e12];
        let keys: Vec<PointKey> = values.iter().map(|v| number_key(*v)).collect();
        for pair in keys.windows(2) {
            assert!(pair[0] <= pair[1]);
        }
        assert_eq!(number_key(-0.0), number_key(0.0));
    }

    #[test]
    fn test_date_keys_preserve_order() {
        let (before_epoch, _) = parse_date("1969-07-20").unwrap();
        let (epoch, _) = parse_date("1970-01-01T00:00:00Z").unwrap();
        let (later, _) = parse_date("2024-02-29T12:00:00").unwrap();
        assert!(date_key(&before_epoch) < date_key(&epoch));
        assert!(date_key(&epoch) < date_key(&later));
    }

    #[test]
    fn test_parse_date_precision() {
        assert_eq!(parse_date("2020-05-01").map(|d| d.1), Some(DatePrecision::Day));
        assert_eq!(
            parse_date("2020-05-01T10:00:00+02:00").map(|d| d.1),
            Some(DatePrecision::Instant)
        );
        assert!(parse_date("May 1st").is_none());
    }

    #[test]
    fn test_parse_number_rejects_non_finite() {
        assert_eq!(parse_number(" 12.5 "), Some(12.5));
        assert_eq!(parse_number("inf"), None);
        assert_eq!(parse_number("NaN"), None);
        assert_eq!(parse_number("abc"), None);
    }
}
