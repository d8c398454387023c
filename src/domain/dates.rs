//! Calendar dates and month windows
//!
//! Request dates are strict `YYYY-MM-DD` strings stored as the start of that day.

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime};
use thiserror::Error;

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DateError {
    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Invalid month: {year}-{month}")]
    InvalidMonth { year: i32, month: u32 },
}

/// Parse a strict `YYYY-MM-DD` date into midnight of that day.
///
/// Out-of-range fields fail instead of wrapping, and the shape must be exact:
/// four-digit year, two-digit month and day.
pub fn parse_date(text: &str) -> Result<NaiveDateTime, DateError> {
    let bytes = text.as_bytes();
    let well_formed = bytes.len() == 10
        && bytes.iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        });
    if !well_formed {
        return Err(DateError::InvalidDate(text.to_string()));
    }

    NaiveDate::parse_from_str(text, DATE_FORMAT)
        .map(|date| date.and_time(NaiveTime::MIN))
        .map_err(|_| DateError::InvalidDate(text.to_string()))
}

/// Format a stored date back to `YYYY-MM-DD`.
pub fn format_date(value: &NaiveDateTime) -> String {
    value.format(DATE_FORMAT).to_string()
}

/// Half-open window `[start, end)` covering one calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthRange {
    pub year: i32,
    pub month: u32,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl MonthRange {
    pub fn new(year: i32, month: u32) -> Result<Self, DateError> {
        let invalid = || DateError::InvalidMonth { year, month };

        let first = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(invalid)?;
        let next = if month == 12 {
            NaiveDate::from_ymd_opt(year + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(year, month + 1, 1)
        }
        .ok_or_else(invalid)?;

        Ok(Self {
            year,
            month,
            start: first.and_time(NaiveTime::MIN),
            end: next.and_time(NaiveTime::MIN),
        })
    }

    pub fn contains(&self, value: &NaiveDateTime) -> bool {
        value.year() == self.year && value.month() == self.month
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_date_is_midnight() {
        let parsed = parse_date("2024-02-29").unwrap();
        assert_eq!(parsed.date(), NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
        assert_eq!(parsed.time(), NaiveTime::MIN);
    }

    #[test]
    fn test_parse_rejects_out_of_range() {
        for text in ["9999-99-99", "2024-13-01", "2024-00-10", "2023-02-29", "2024-04-31"] {
            assert_eq!(
                parse_date(text),
                Err(DateError::InvalidDate(text.to_string())),
                "{text} should fail"
            );
        }
    }

    #[test]
    fn test_parse_rejects_loose_shapes() {
        for text in ["", "2024-1-05", "24-01-05", "2024/01/05", "2024-01-05T00:00", " 2024-01-05", "+2024-01-5"] {
            assert!(parse_date(text).is_err(), "{text:?} should fail");
        }
    }

    #[test]
    fn test_parse_format_round_trip() {
        for text in ["2024-01-01", "1999-12-31", "2024-02-29", "0001-01-01"] {
            assert_eq!(format_date(&parse_date(text).unwrap()), text);
        }
    }

    #[test]
    fn test_month_range_bounds() {
        let range = MonthRange::new(2024, 12).unwrap();
        assert_eq!(range.start, parse_date("2024-12-01").unwrap());
        assert_eq!(range.end, parse_date("2025-01-01").unwrap());

        assert!(range.contains(&parse_date("2024-12-31").unwrap()));
        assert!(!range.contains(&parse_date("2025-01-01").unwrap()));
        assert!(!range.contains(&parse_date("2023-12-15").unwrap()));
    }

    #[test]
    fn test_month_range_rejects_bad_month() {
        assert!(MonthRange::new(2024, 0).is_err());
        assert!(MonthRange::new(2024, 13).is_err());
    }
}
