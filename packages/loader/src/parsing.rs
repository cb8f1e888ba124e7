//! Shared cell parsing utilities.
//!
//! Number and date parsing used by both the spreadsheet and delimited-text
//! readers. Spanish exports frequently use a decimal comma and
//! day-first dates, so both are accepted alongside ISO forms.

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};

/// Date-only formats tried in order.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y", "%Y/%m/%d"];

/// Date-time formats tried in order (the time part is discarded).
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

/// Parses a number, accepting a decimal comma. Returns `None` for empty,
/// unparseable or non-finite input.
#[must_use]
pub fn parse_number(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }

    let value = if trimmed.contains(',') && !trimmed.contains('.') {
        trimmed.replace(',', ".").parse::<f64>().ok()?
    } else {
        trimmed.parse::<f64>().ok()?
    };

    value.is_finite().then_some(value)
}

/// Parses a calendar date from text.
#[must_use]
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return Some(date);
        }
    }
    for format in DATETIME_FORMATS {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(datetime.date());
        }
    }
    None
}

/// Converts a spreadsheet serial date (days since 1899-12-30, the 1900
/// date system as written by every modern writer) to a date-time.
#[must_use]
pub fn excel_serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }

    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    #[allow(clippy::cast_possible_truncation)]
    let millis = (serial * 86_400_000.0).round() as i64;
    epoch.checked_add_signed(TimeDelta::try_milliseconds(millis)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_and_comma_decimals() {
        assert_eq!(parse_number("440123"), Some(440_123.0));
        assert_eq!(parse_number(" 40.4168 "), Some(40.4168));
        assert_eq!(parse_number("40,4168"), Some(40.4168));
        assert_eq!(parse_number("-3,7038"), Some(-3.7038));
    }

    #[test]
    fn rejects_empty_and_garbage_numbers() {
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number("   "), None);
        assert_eq!(parse_number("NULL"), None);
        assert_eq!(parse_number("inf"), None);
    }

    #[test]
    fn parses_iso_and_day_first_dates() {
        let expected = NaiveDate::from_ymd_opt(2023, 3, 14).unwrap();
        assert_eq!(parse_date("2023-03-14"), Some(expected));
        assert_eq!(parse_date("14/03/2023"), Some(expected));
        assert_eq!(parse_date("2023-03-14 00:00:00"), Some(expected));
        assert_eq!(parse_date("2023-03-14T08:30:00"), Some(expected));
    }

    #[test]
    fn rejects_invalid_dates() {
        assert_eq!(parse_date("not-a-date"), None);
        assert_eq!(parse_date("2023-02-30"), None);
        assert_eq!(parse_date(""), None);
    }

    #[test]
    fn converts_spreadsheet_serials() {
        // 44_999 is 2023-03-14 in the 1900 date system.
        let datetime = excel_serial_to_datetime(44_999.0).unwrap();
        assert_eq!(datetime.date(), NaiveDate::from_ymd_opt(2023, 3, 14).unwrap());

        let noon = excel_serial_to_datetime(44_999.5).unwrap();
        assert_eq!(noon.to_string(), "2023-03-14 12:00:00");

        assert!(excel_serial_to_datetime(-1.0).is_none());
        assert!(excel_serial_to_datetime(f64::NAN).is_none());
    }
}
