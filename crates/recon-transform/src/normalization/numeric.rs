//! Numeric normalization utilities.

/// Currency symbols and codes stripped before parsing an amount.
const CURRENCY_MARKERS: &[&str] = &["₹", "$", "€", "£", "¥", "Rs.", "Rs", "rs", "INR", "inr", "USD", "EUR", "GBP"];

/// Parses a string as f64, returning None for invalid, empty or non-finite strings.
pub fn parse_f64(value: &str) -> Option<f64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Whether a value reads as a number once thousands separators are removed.
///
/// Values with a decimal point parse as floats, others as integers.
pub fn is_numeric(value: &str) -> bool {
    let cleaned = value.trim().replace(',', "");
    if cleaned.is_empty() {
        return false;
    }
    if cleaned.contains('.') {
        cleaned.parse::<f64>().is_ok_and(f64::is_finite)
    } else {
        cleaned.parse::<i64>().is_ok()
    }
}

/// Formats a floating-point number without trailing fractional zeros.
pub fn format_numeric(v: f64) -> String {
    let s = format!("{v}");
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        s
    }
}

pub fn round_to(v: f64, places: i32) -> f64 {
    // Beyond this magnitude there are no fractional digits left to round.
    if v.abs() >= 1e15 {
        return v;
    }
    let factor = 10f64.powi(places);
    let rounded = (v * factor).round() / factor;
    // Avoid emitting "-0".
    if rounded == 0.0 { 0.0 } else { rounded }
}

fn strip_amount_noise(value: &str) -> String {
    let mut cleaned = value.trim().to_string();
    for marker in CURRENCY_MARKERS {
        cleaned = cleaned.replace(marker, "");
    }
    cleaned
        .chars()
        .filter(|c| !matches!(c, ',' | '"' | '\'') && !c.is_whitespace())
        .collect()
}

/// Parse a monetary value: currency markers, quotes and thousands separators
/// are removed and the result is rounded to two decimals.
pub fn parse_amount(value: &str) -> Option<f64> {
    parse_f64(&strip_amount_noise(value)).map(|v| round_to(v, 2))
}

/// Parse a percentage. `"18%"` is 0.18; bare numbers are taken as given.
pub fn parse_percentage(value: &str) -> Option<f64> {
    let cleaned = strip_amount_noise(value);
    match cleaned.strip_suffix('%') {
        Some(number) => parse_f64(number).map(|v| round_to(v / 100.0, 4)),
        None => parse_f64(&cleaned).map(|v| round_to(v, 4)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amounts_drop_symbols_and_separators() {
        assert_eq!(parse_amount("₹1,234.50"), Some(1234.5));
        assert_eq!(parse_amount("\"2,000\""), Some(2000.0));
        assert_eq!(parse_amount("Rs. 99.999"), Some(100.0));
        assert_eq!(parse_amount("INR 12"), Some(12.0));
        assert_eq!(parse_amount("free"), None);
        assert_eq!(parse_amount("inf"), None);
    }

    #[test]
    fn percentages_divide_by_hundred() {
        assert_eq!(parse_percentage("18%"), Some(0.18));
        assert_eq!(parse_percentage("12.5 %"), Some(0.125));
        assert_eq!(parse_percentage("0.18"), Some(0.18));
    }

    #[test]
    fn format_keeps_integer_zeros() {
        assert_eq!(format_numeric(100.0), "100");
        assert_eq!(format_numeric(1234.5), "1234.5");
        assert_eq!(format_numeric(0.18), "0.18");
    }

    #[test]
    fn numeric_detection_strips_commas() {
        assert!(is_numeric("1,234"));
        assert!(is_numeric("12.50"));
        assert!(!is_numeric("12a"));
        assert!(!is_numeric(""));
    }
}
