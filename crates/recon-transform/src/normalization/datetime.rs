//! Calendar date parsing and ISO formatting.
//!
//! Values are parsed leniently and emitted as `YYYY-MM-DD`. Purely numeric
//! forms such as `03/04/2025` are ambiguous: the preferred order
//! (day-first by default) is tried first and the swapped order second.
//! Unparseable values are left as they are.

use chrono::{NaiveDate, NaiveDateTime};

pub const ISO_DATE: &str = "%Y-%m-%d";

/// Formats with an unambiguous field order.
const UNAMBIGUOUS_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%Y%m%d",
    "%d-%b-%y",
    "%d-%b-%Y",
    "%d %b %y",
    "%d %b %Y",
    "%d-%B-%Y",
    "%d %B %Y",
];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Two-digit years are tried before four-digit ones so `01/02/25` is not year 25.
const DAY_FIRST_FORMATS: &[&str] = &[
    "%d/%m/%y", "%d/%m/%Y", "%d-%m-%y", "%d-%m-%Y", "%d.%m.%y", "%d.%m.%Y",
];

const MONTH_FIRST_FORMATS: &[&str] = &[
    "%m/%d/%y", "%m/%d/%Y", "%m-%d-%y", "%m-%d-%Y", "%m.%d.%y", "%m.%d.%Y",
];

/// Try a list of date formats in order.
pub fn parse_with_formats(value: &str, formats: &[&str]) -> Option<NaiveDate> {
    formats
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
}

fn try_parse_datetime(value: &str) -> Option<NaiveDate> {
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .map(|dt| dt.date())
}

/// Parse a date value, resolving numeric day/month ambiguity by `day_first`.
pub fn parse_date_value(value: &str, day_first: bool) -> Option<NaiveDate> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Some(date) = parse_with_formats(trimmed, UNAMBIGUOUS_FORMATS) {
        return Some(date);
    }
    if let Some(date) = try_parse_datetime(trimmed) {
        return Some(date);
    }
    let (primary, secondary) = if day_first {
        (DAY_FIRST_FORMATS, MONTH_FIRST_FORMATS)
    } else {
        (MONTH_FIRST_FORMATS, DAY_FIRST_FORMATS)
    };
    parse_with_formats(trimmed, primary).or_else(|| parse_with_formats(trimmed, secondary))
}

/// Whether `value` is exactly a valid `YYYY-MM-DD` date.
pub fn is_iso_date(value: &str) -> bool {
    let value = value.trim();
    value.len() == 10 && NaiveDate::parse_from_str(value, ISO_DATE).is_ok()
}

/// Normalize to `YYYY-MM-DD`, or return the trimmed original when unparseable.
pub fn normalize_date(value: &str, day_first: bool) -> String {
    match parse_date_value(value, day_first) {
        Some(date) => date.format(ISO_DATE).to_string(),
        None => value.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn text_month_forms() {
        assert_eq!(parse_date_value("25-Mar-2025", true), Some(ymd(2025, 3, 25)));
        assert_eq!(parse_date_value("02 Aug 2025", true), Some(ymd(2025, 8, 2)));
        assert_eq!(parse_date_value("02-Aug-25", true), Some(ymd(2025, 8, 2)));
    }

    #[test]
    fn compact_digits_are_dates() {
        assert_eq!(parse_date_value("20250809", true), Some(ymd(2025, 8, 9)));
    }

    #[test]
    fn day_first_with_swap_fallback() {
        assert_eq!(parse_date_value("03/04/2025", true), Some(ymd(2025, 4, 3)));
        assert_eq!(parse_date_value("03/04/2025", false), Some(ymd(2025, 3, 4)));
        // 13 cannot be a month, so the swapped order wins.
        assert_eq!(parse_date_value("04/13/2025", true), Some(ymd(2025, 4, 13)));
        assert_eq!(parse_date_value("01/02/25", true), Some(ymd(2025, 2, 1)));
    }

    #[test]
    fn datetime_keeps_date() {
        assert_eq!(
            parse_date_value("2025-08-09 14:30:00", true),
            Some(ymd(2025, 8, 9))
        );
    }

    #[test]
    fn unparseable_left_unchanged() {
        assert_eq!(normalize_date(" soon ", true), "soon");
        assert_eq!(normalize_date("2025-02-30", true), "2025-02-30");
    }

    #[test]
    fn iso_is_fixed_point() {
        assert_eq!(normalize_date("2025-03-25", true), "2025-03-25");
        assert!(is_iso_date("2025-03-25"));
        assert!(!is_iso_date("25-03-2025"));
    }
}
