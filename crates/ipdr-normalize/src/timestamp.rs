//! Locale-agnostic timestamp parsing for IPDR date columns.
//!
//! Operators disagree on date layout. Slashes are normalized to dashes
//! first, then the value is tried against RFC 3339, a set of naive layouts
//! (read as UTC), date-only layouts, and finally epoch seconds/milliseconds.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// Naive date-time layouts, tried in order. `%.f` also accepts no fraction.
const DATETIME_LAYOUTS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%d-%m-%Y %H:%M:%S%.f",
    "%d-%m-%Y %H:%M",
    "%Y%m%d%H%M%S",
];

const DATE_LAYOUTS: &[&str] = &["%Y-%m-%d", "%d-%m-%Y"];

/// Epoch values with at least this many digits are milliseconds.
const EPOCH_MILLIS_DIGITS: usize = 13;

/// Parse `raw` into a UTC timestamp, or `None` if no layout matches.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let s = trimmed.replace('/', "-");

    if let Ok(dt) = DateTime::parse_from_rfc3339(&s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(&s, "%Y-%m-%d %H:%M:%S%.f %z") {
        return Some(dt.with_timezone(&Utc));
    }

    if s.bytes().all(|b| b.is_ascii_digit()) && s.len() != 14 {
        return parse_epoch(&s);
    }

    for layout in DATETIME_LAYOUTS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(&s, layout) {
            return Some(naive.and_utc());
        }
    }
    for layout in DATE_LAYOUTS {
        if let Ok(date) = NaiveDate::parse_from_str(&s, layout) {
            return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
        }
    }
    None
}

fn parse_epoch(digits: &str) -> Option<DateTime<Utc>> {
    let value: i64 = digits.parse().ok()?;
    if digits.len() >= EPOCH_MILLIS_DIGITS {
        DateTime::from_timestamp_millis(value)
    } else {
        DateTime::from_timestamp(value, 0)
    }
}

/// Millisecond-precision ISO 8601 form used inside row fingerprints.
///
/// Absent timestamps render as `Invalid Date` so malformed rows still hash
/// deterministically.
pub fn iso_or_invalid(ts: Option<&DateTime<Utc>>) -> String {
    match ts {
        Some(ts) => ts.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string(),
        None => "Invalid Date".to_string(),
    }
}

/// Whole seconds from `start` to `end`, floored, never negative; 0 when
/// either end is missing.
pub fn duration_seconds(start: Option<&DateTime<Utc>>, end: Option<&DateTime<Utc>>) -> u64 {
    match (start, end) {
        (Some(start), Some(end)) => {
            let millis = (*end - *start).num_milliseconds();
            u64::try_from(millis.div_euclid(1000)).unwrap_or(0)
        }
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Datelike, TimeZone, Timelike};

    use super::*;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[test]
    fn parses_space_separated_layout() {
        assert_eq!(
            parse_timestamp("2025-08-20 10:00:05"),
            Some(utc(2025, 8, 20, 10, 0, 5))
        );
    }

    #[test]
    fn slashes_are_treated_as_dashes() {
        assert_eq!(
            parse_timestamp("2025/08/20 10:00:05"),
            Some(utc(2025, 8, 20, 10, 0, 5))
        );
        assert_eq!(
            parse_timestamp("20/08/2025 10:00:05"),
            Some(utc(2025, 8, 20, 10, 0, 5))
        );
    }

    #[test]
    fn parses_rfc3339_with_offset() {
        let ts = parse_timestamp("2025-08-20T15:30:05+05:30").unwrap();
        assert_eq!(ts, utc(2025, 8, 20, 10, 0, 5));
    }

    #[test]
    fn parses_fractional_seconds() {
        let ts = parse_timestamp("2025-08-20T10:00:05.250").unwrap();
        assert_eq!(ts.nanosecond(), 250_000_000);
    }

    #[test]
    fn parses_date_only_and_compact_layouts() {
        assert_eq!(parse_timestamp("2025-08-20"), Some(utc(2025, 8, 20, 0, 0, 0)));
        assert_eq!(
            parse_timestamp("20250820100005"),
            Some(utc(2025, 8, 20, 10, 0, 5))
        );
    }

    #[test]
    fn parses_epoch_seconds_and_millis() {
        assert_eq!(parse_timestamp("1755684005"), Some(utc(2025, 8, 20, 10, 0, 5)));
        let ms = parse_timestamp("1755684005500").unwrap();
        assert_eq!(ms.year(), 2025);
        assert_eq!(ms.timestamp_subsec_millis(), 500);
    }

    #[test]
    fn garbage_yields_none() {
        assert_eq!(parse_timestamp(""), None);
        assert_eq!(parse_timestamp("   "), None);
        assert_eq!(parse_timestamp("yesterday"), None);
        assert_eq!(parse_timestamp("2025-13-45 99:00:00"), None);
    }

    #[test]
    fn iso_rendering_uses_millis_and_z() {
        let ts = utc(2025, 8, 20, 10, 0, 5);
        assert_eq!(iso_or_invalid(Some(&ts)), "2025-08-20T10:00:05.000Z");
        assert_eq!(iso_or_invalid(None), "Invalid Date");
    }

    #[test]
    fn duration_is_floored_and_clamped() {
        let start = utc(2025, 8, 20, 10, 0, 5);
        let end = utc(2025, 8, 20, 10, 0, 15);
        assert_eq!(duration_seconds(Some(&start), Some(&end)), 10);
        assert_eq!(duration_seconds(Some(&end), Some(&start)), 0);
        assert_eq!(duration_seconds(None, Some(&end)), 0);

        let end_frac = end + chrono::Duration::milliseconds(999);
        assert_eq!(duration_seconds(Some(&start), Some(&end_frac)), 10);
    }
}
