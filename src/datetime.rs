//! Date/time utilities for mentorchat.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

/// Local date-time layouts the backend emits, most specific first.
const SERVER_LOCAL_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
];

/// Parse a timestamp written by the backend.
///
/// # Arguments
///
/// * `datetime_str` - RFC3339 string, or a local date-time without offset
/// * `timezone` - Timezone the backend writes local date-times in
///
/// # Returns
///
/// The instant in UTC, or `None` if the string or the timezone cannot be parsed.
pub fn parse_server_time(datetime_str: &str, timezone: &str) -> Option<DateTime<Utc>> {
    let trimmed = datetime_str.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }

    let tz: Tz = timezone.parse().ok()?;
    SERVER_LOCAL_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok())
        .and_then(|naive| tz.from_local_datetime(&naive).earliest())
        .map(|local| local.with_timezone(&Utc))
}

/// Format a DateTime<Utc> to the specified timezone.
///
/// Falls back to formatting in UTC when the timezone is unknown.
pub fn format_utc_datetime(dt: &DateTime<Utc>, timezone: &str, format: &str) -> String {
    let tz: Tz = match timezone.parse() {
        Ok(tz) => tz,
        Err(_) => return dt.format(format).to_string(),
    };
    dt.with_timezone(&tz).format(format).to_string()
}

/// Format the time of day of a message.
pub fn format_time(dt: &DateTime<Utc>, timezone: &str) -> String {
    format_utc_datetime(dt, timezone, "%H:%M:%S")
}

/// Format the date of a room's last activity.
pub fn format_date(dt: &DateTime<Utc>, timezone: &str) -> String {
    format_utc_datetime(dt, timezone, "%Y/%m/%d")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_server_time_rfc3339() {
        let dt = parse_server_time("2024-01-15T10:30:00+00:00", "Africa/Johannesburg").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap());
    }

    #[test]
    fn test_parse_server_time_local_with_seconds() {
        // Johannesburg is UTC+2
        let dt = parse_server_time("2024-01-15T12:30:45", "Africa/Johannesburg").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 45).unwrap());
    }

    #[test]
    fn test_parse_server_time_local_with_fraction() {
        let dt = parse_server_time("2024-01-15T10:30:45.123456", "UTC").unwrap();
        assert_eq!(dt.format("%H:%M:%S%.3f").to_string(), "10:30:45.123");
    }

    #[test]
    fn test_parse_server_time_local_without_seconds() {
        let dt = parse_server_time("2024-01-15T10:30", "UTC").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap());
    }

    #[test]
    fn test_parse_server_time_sql_layout() {
        let dt = parse_server_time("2024-01-15 10:30:00", "UTC").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap());
    }

    #[test]
    fn test_parse_server_time_invalid() {
        assert!(parse_server_time("not a date", "UTC").is_none());
        assert!(parse_server_time("", "UTC").is_none());
    }

    #[test]
    fn test_parse_server_time_invalid_timezone() {
        assert!(parse_server_time("2024-01-15T10:30:00", "Invalid/Zone").is_none());
        // RFC3339 carries its own offset
        assert!(parse_server_time("2024-01-15T10:30:00Z", "Invalid/Zone").is_some());
    }

    #[test]
    fn test_format_utc_datetime() {
        let dt = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap();
        let result = format_utc_datetime(&dt, "Africa/Johannesburg", "%Y/%m/%d %H:%M");
        assert_eq!(result, "2024/01/15 12:30");
    }

    #[test]
    fn test_format_utc_datetime_invalid_timezone() {
        let dt = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap();
        let result = format_utc_datetime(&dt, "Invalid/Zone", "%Y/%m/%d %H:%M");
        assert_eq!(result, "2024/01/15 10:30");
    }

    #[test]
    fn test_format_time_and_date() {
        let dt = Utc.with_ymd_and_hms(2024, 1, 15, 23, 5, 9).unwrap();
        assert_eq!(format_time(&dt, "UTC"), "23:05:09");
        assert_eq!(format_date(&dt, "Africa/Johannesburg"), "2024/01/16");
    }
}
