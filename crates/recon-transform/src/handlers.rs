//! Per-field-kind normalize/validate handlers.
//!
//! Every canonical field resolves to one [`FieldHandler`] through its
//! [`FieldKind`]; adding a field kind means adding one handler here.

use std::sync::LazyLock;

use recon_model::{CellValue, CleaningOptions, CleaningRuleKind, FieldKind};
use regex::Regex;

use crate::normalization::{
    collapse_whitespace, format_numeric, is_iso_date, normalize_date, parse_amount, parse_f64,
    parse_percentage,
};

static IDENTIFIER_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[A-Z0-9]{5,30}$").ok());

/// Normalize and validate capability for one field kind.
#[derive(Debug, Clone, Copy)]
pub struct FieldHandler {
    /// Rule reported when normalization changes a value.
    pub rule: CleaningRuleKind,
    pub confidence: f32,
    normalize: fn(&str, &CleaningOptions) -> CellValue,
    validate: fn(&CellValue) -> bool,
}

impl FieldHandler {
    /// Normalize one present value. Missing values stay missing.
    pub fn normalize(&self, value: &CellValue, options: &CleaningOptions) -> CellValue {
        match value {
            CellValue::Text(text) => (self.normalize)(text, options),
            CellValue::Missing => CellValue::Missing,
        }
    }

    pub fn validate(&self, value: &CellValue) -> bool {
        (self.validate)(value)
    }
}

const IDENTIFIER: FieldHandler = FieldHandler {
    rule: CleaningRuleKind::IdentifierNormalize,
    confidence: 0.95,
    normalize: normalize_identifier,
    validate: validate_identifier,
};

const AMOUNT: FieldHandler = FieldHandler {
    rule: CleaningRuleKind::AmountParse,
    confidence: 0.95,
    normalize: normalize_amount,
    validate: validate_number,
};

const QUANTITY: FieldHandler = FieldHandler {
    rule: CleaningRuleKind::AmountParse,
    confidence: 0.95,
    normalize: normalize_amount,
    validate: validate_number,
};

const PERCENTAGE: FieldHandler = FieldHandler {
    rule: CleaningRuleKind::PercentageParse,
    confidence: 0.95,
    normalize: normalize_percentage,
    validate: validate_number,
};

const DATE: FieldHandler = FieldHandler {
    rule: CleaningRuleKind::DateStandardize,
    confidence: 0.9,
    normalize: normalize_date_cell,
    validate: validate_date,
};

const POSTAL_CODE: FieldHandler = FieldHandler {
    rule: CleaningRuleKind::PostalPlaceholder,
    confidence: 0.9,
    normalize: normalize_postal,
    validate: always_valid,
};

const PHONE: FieldHandler = FieldHandler {
    rule: CleaningRuleKind::PhoneStrip,
    confidence: 0.9,
    normalize: normalize_phone,
    validate: always_valid,
};

const EMAIL: FieldHandler = FieldHandler {
    rule: CleaningRuleKind::EmailNormalize,
    confidence: 0.95,
    normalize: normalize_email,
    validate: always_valid,
};

const ADDRESS: FieldHandler = FieldHandler {
    rule: CleaningRuleKind::WhitespaceCleanup,
    confidence: 1.0,
    normalize: normalize_spaced_text,
    validate: validate_present,
};

const COUNTRY: FieldHandler = FieldHandler {
    rule: CleaningRuleKind::CountryNormalize,
    confidence: 0.9,
    normalize: normalize_country,
    validate: validate_present,
};

const CURRENCY: FieldHandler = FieldHandler {
    rule: CleaningRuleKind::CurrencyNormalize,
    confidence: 0.9,
    normalize: normalize_currency,
    validate: validate_present,
};

const TEXT: FieldHandler = FieldHandler {
    rule: CleaningRuleKind::WhitespaceCleanup,
    confidence: 1.0,
    normalize: keep_text,
    validate: always_valid,
};

/// Handler for a field kind.
pub fn handler(kind: FieldKind) -> &'static FieldHandler {
    match kind {
        FieldKind::Identifier => &IDENTIFIER,
        FieldKind::Amount => &AMOUNT,
        FieldKind::Percentage => &PERCENTAGE,
        FieldKind::Quantity => &QUANTITY,
        FieldKind::Date => &DATE,
        FieldKind::PostalCode => &POSTAL_CODE,
        FieldKind::Phone => &PHONE,
        FieldKind::Email => &EMAIL,
        FieldKind::Address => &ADDRESS,
        FieldKind::Country => &COUNTRY,
        FieldKind::Currency => &CURRENCY,
        FieldKind::Text => &TEXT,
    }
}

/// Convenience for one-off normalization of a raw string.
pub fn normalize_value(kind: FieldKind, value: &str, options: &CleaningOptions) -> CellValue {
    handler(kind).normalize(&CellValue::text(value), options)
}

fn text_or_missing(value: String) -> CellValue {
    if value.is_empty() {
        CellValue::Missing
    } else {
        CellValue::Text(value)
    }
}

fn normalize_identifier(value: &str, _: &CleaningOptions) -> CellValue {
    text_or_missing(
        value
            .chars()
            .filter(char::is_ascii_alphanumeric)
            .map(|c| c.to_ascii_uppercase())
            .collect(),
    )
}

fn validate_identifier(value: &CellValue) -> bool {
    match value.as_text() {
        Some(text) => IDENTIFIER_PATTERN
            .as_ref()
            .is_some_and(|pattern| pattern.is_match(text)),
        None => true,
    }
}

fn normalize_amount(value: &str, _: &CleaningOptions) -> CellValue {
    match parse_amount(value) {
        Some(number) => CellValue::Text(format_numeric(number)),
        None => text_or_missing(value.trim().to_string()),
    }
}

fn normalize_percentage(value: &str, _: &CleaningOptions) -> CellValue {
    match parse_percentage(value) {
        Some(number) => CellValue::Text(format_numeric(number)),
        None => text_or_missing(value.trim().to_string()),
    }
}

fn validate_number(value: &CellValue) -> bool {
    value.as_text().is_none_or(|text| parse_f64(text).is_some())
}

fn normalize_date_cell(value: &str, options: &CleaningOptions) -> CellValue {
    text_or_missing(normalize_date(value, options.day_first))
}

fn validate_date(value: &CellValue) -> bool {
    value.as_text().is_none_or(is_iso_date)
}

fn normalize_postal(value: &str, options: &CleaningOptions) -> CellValue {
    let trimmed = value.trim();
    if options.is_postal_placeholder(trimmed) {
        CellValue::Missing
    } else {
        text_or_missing(trimmed.to_string())
    }
}

fn normalize_phone(value: &str, _: &CleaningOptions) -> CellValue {
    let kept: String = value
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '+' | '-'))
        .collect();
    if kept.chars().any(|c| c.is_ascii_digit()) {
        CellValue::Text(kept)
    } else {
        text_or_missing(value.trim().to_string())
    }
}

fn normalize_email(value: &str, _: &CleaningOptions) -> CellValue {
    let collapsed = collapse_whitespace(value);
    let joined = collapsed
        .split('@')
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("@");
    text_or_missing(joined)
}

fn normalize_spaced_text(value: &str, _: &CleaningOptions) -> CellValue {
    text_or_missing(collapse_whitespace(value))
}

fn normalize_country(value: &str, _: &CleaningOptions) -> CellValue {
    let collapsed = collapse_whitespace(value);
    match collapsed.to_lowercase().as_str() {
        "in" | "ind" | "india" | "bharat" => CellValue::text("India"),
        _ => text_or_missing(collapsed),
    }
}

fn normalize_currency(value: &str, options: &CleaningOptions) -> CellValue {
    let trimmed = value.trim();
    let code = match trimmed.to_lowercase().as_str() {
        "₹" | "rs" | "rs." | "inr" | "rupee" | "rupees" => "INR".to_string(),
        "$" | "us$" | "usd" => "USD".to_string(),
        "€" | "eur" => "EUR".to_string(),
        "£" | "gbp" => "GBP".to_string(),
        other if other.len() == 3 && other.chars().all(|c| c.is_ascii_alphabetic()) => {
            other.to_ascii_uppercase()
        }
        _ => options.default_currency.clone(),
    };
    CellValue::Text(code)
}

fn keep_text(value: &str, _: &CleaningOptions) -> CellValue {
    text_or_missing(value.to_string())
}

fn validate_present(value: &CellValue) -> bool {
    !value.is_blank()
}

fn always_valid(_: &CellValue) -> bool {
    true
}
