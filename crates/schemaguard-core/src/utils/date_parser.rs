use arrow_array::{StringArray, TimestampMillisecondArray};
use chrono::{DateTime, NaiveDate, NaiveDateTime};

const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

pub fn parse_datetime_column(array: &StringArray) -> TimestampMillisecondArray {
    array
        .iter()
        .map(|opt_str| opt_str.and_then(parse_datetime))
        .collect()
}

/// Parse an ISO-8601-ish date or datetime into milliseconds since the epoch.
///
/// Accepts `YYYY`, `YYYY-MM`, `YYYY-MM-DD`, `YYYY-MM-DD[T ]HH` and
/// `YYYY-MM-DD[T ]HH:MM[:SS[.fff]]`,
/// the latter optionally followed by `Z` or a `±HH:MM` offset.
pub fn parse_datetime(value: &str) -> Option<i64> {
    let value = value.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.timestamp_millis());
    }
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Some(dt.and_utc().timestamp_millis());
        }
    }
    if let Some(dt) = parse_date_hour(value) {
        return Some(dt.and_utc().timestamp_millis());
    }
    parse_date(value).map(|date| date.and_time(chrono::NaiveTime::MIN).and_utc().timestamp_millis())
}

// chrono cannot build a time from an hour alone.
fn parse_date_hour(value: &str) -> Option<NaiveDateTime> {
    let date = value.get(..10)?;
    let hour = value.get(10..)?.strip_prefix(|c: char| c == 'T' || c == ' ')?;
    if hour.len() != 2 || !hour.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .ok()?
        .and_hms_opt(hour.parse().ok()?, 0, 0)
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    let bytes = value.as_bytes();
    match bytes.len() {
        // YYYY
        4 if bytes.iter().all(u8::is_ascii_digit) => {
            NaiveDate::from_ymd_opt(value.parse().ok()?, 1, 1)
        }
        // YYYY-MM
        7 if bytes[4] == b'-' => {
            NaiveDate::parse_from_str(&format!("{}-01", value), "%Y-%m-%d").ok()
        }
        _ => NaiveDate::parse_from_str(value, "%Y-%m-%d").ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow_array::Array;

    #[test]
    fn test_parse_plain_date() {
        assert_eq!(parse_datetime("1970-01-02"), Some(86_400_000));
        assert!(parse_datetime("2024-02-29").is_some());
        assert!(parse_datetime("2023-02-29").is_none());
    }

    #[test]
    fn test_parse_partial_dates() {
        assert_eq!(parse_datetime("1970"), Some(0));
        assert_eq!(parse_datetime("1970-01"), Some(0));
        assert!(parse_datetime("2024-13").is_none());
    }

    #[test]
    fn test_parse_datetimes() {
        assert_eq!(parse_datetime("1970-01-01T00:00:01"), Some(1_000));
        assert_eq!(parse_datetime("1970-01-01 00:01"), Some(60_000));
        assert_eq!(parse_datetime("1970-01-01T00:00:00.250"), Some(250));
        assert_eq!(parse_datetime("1970-01-01T01:00:00+01:00"), Some(0));
        assert_eq!(parse_datetime("1970-01-01T00:00:00Z"), Some(0));
    }

    #[test]
    fn test_parse_hour_only_datetimes() {
        assert_eq!(parse_datetime("1970-01-01T01"), Some(3_600_000));
        assert_eq!(parse_datetime("1970-01-01 02"), Some(7_200_000));
        assert!(parse_datetime("2024-01-15T10").is_some());
        assert!(parse_datetime("2024-01-15T24").is_none());
        assert!(parse_datetime("2024-01-15T1").is_none());
        assert!(parse_datetime("2024-01-15X10").is_none());
    }

    #[test]
    fn test_reject_garbage() {
        assert!(parse_datetime("not a date").is_none());
        assert!(parse_datetime("").is_none());
        assert!(parse_datetime("15/01/2024").is_none());
        assert!(parse_datetime("2024-01-15T25:00:00").is_none());
    }

    #[test]
    fn test_parse_column_keeps_positions() {
        let array = StringArray::from(vec![Some("2024-01-15"), Some("nope"), None]);
        let parsed = parse_datetime_column(&array);
        assert_eq!(parsed.len(), 3);
        assert!(parsed.is_valid(0));
        assert!(parsed.is_null(1));
        assert!(parsed.is_null(2));
    }
}
