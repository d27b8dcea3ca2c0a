//! Row-level fix detection over a cleaned table.
//!
//! Detection is stateless: every call re-scans the table and proposes a fix
//! only where a known, mechanically correctable pattern matches.

use std::sync::LazyLock;

use recon_model::{CellValue, CleaningOptions, ColumnBinding, FieldKind, FixKind, Table, TargetedFix};
use recon_transform::normalization::datetime::ISO_DATE;
use recon_transform::normalization::parse_with_formats;
use regex::Regex;
use tracing::debug;

/// Alternate date layouts tried, in order, for non-ISO values.
pub const FIX_DATE_FORMATS: &[&str] = &[
    "%d/%m/%Y",
    "%d %b %Y",
    "%d-%b-%Y",
    "%b %d %Y",
    "%b %d, %Y",
    "%B %d %Y",
    "%B %d, %Y",
    "%d %b, %Y",
    "%Y.%m.%d",
];

/// Digits substituted for a postal `XX` placeholder; the first is the default.
pub const POSTAL_SUBSTITUTIONS: &[&str] = &["00", "01", "10"];

/// Length of `+CCNNNNNNNNNN` once separators are stripped.
const PHONE_WITH_CODE_LEN: usize = 13;

static CANONICAL_PHONE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^\+\d{2}-\d{10}$").ok());
static POSTAL_PLACEHOLDER: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)^(\d+)xx(\d+)$").ok());
static ISO_SHAPE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").ok());
static AT_SPACING: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\s*@\s*").ok());

fn matches(pattern: &LazyLock<Option<Regex>>, value: &str) -> bool {
    pattern.as_ref().is_some_and(|re| re.is_match(value))
}

/// A proposed replacement for one cell before it is tied to a location.
struct Proposal {
    kind: FixKind,
    suggested: String,
    alternatives: Vec<String>,
    issue: String,
    confidence: f32,
    description: String,
}

/// Scans cleaned columns for residual, pattern-specific problems.
#[derive(Debug, Clone, Default)]
pub struct FixDetector {
    options: CleaningOptions,
}

impl FixDetector {
    pub fn new(options: CleaningOptions) -> Self {
        Self { options }
    }

    /// Propose fixes for every bound phone, email, postal and date column.
    ///
    /// Fixes come out in binding order, then row order.
    pub fn detect(&self, table: &Table, bindings: &[ColumnBinding]) -> Vec<TargetedFix> {
        let mut fixes = Vec::new();
        for binding in bindings {
            let Some(kind) = binding.kind else {
                continue;
            };
            let Some(index) = table.column_index(&binding.output) else {
                continue;
            };
            for (row, cells) in table.rows().iter().enumerate() {
                let CellValue::Text(value) = &cells[index] else {
                    continue;
                };
                if value.trim().is_empty() {
                    continue;
                }
                if let Some(proposal) = self.propose(kind, value) {
                    fixes.push(TargetedFix {
                        kind: proposal.kind,
                        column: binding.output.clone(),
                        row,
                        current_value: value.clone(),
                        suggested_fix: proposal.suggested,
                        alternatives: proposal.alternatives,
                        issue: proposal.issue,
                        confidence: proposal.confidence,
                        fix_description: proposal.description,
                    });
                }
            }
        }
        debug!(fixes = fixes.len(), "fix detection complete");
        fixes
    }

    fn propose(&self, kind: FieldKind, value: &str) -> Option<Proposal> {
        match kind {
            FieldKind::Phone => self.phone(value),
            FieldKind::Email => email(value),
            FieldKind::PostalCode => postal(value),
            FieldKind::Date => date(value),
            _ => None,
        }
    }

    fn phone(&self, value: &str) -> Option<Proposal> {
        let value = value.trim();
        let code = &self.options.phone_country_code;
        if value.len() == 10 && value.chars().all(|c| c.is_ascii_digit()) {
            return Some(Proposal {
                kind: FixKind::PhoneMissingCountryCode,
                suggested: format!("{code}-{value}"),
                alternatives: Vec::new(),
                issue: format!("Phone number missing country code: {value}"),
                confidence: 0.9,
                description: format!("Add {code}- prefix for local numbers"),
            });
        }
        if value.starts_with('+') && !matches(&CANONICAL_PHONE, value) {
            let stripped: String = value
                .chars()
                .filter(|c| c.is_ascii_digit() || *c == '+')
                .collect();
            if stripped.len() == PHONE_WITH_CODE_LEN && !stripped[1..].contains('+') {
                return Some(Proposal {
                    kind: FixKind::PhoneFormatFix,
                    suggested: format!("{}-{}", &stripped[..3], &stripped[3..]),
                    alternatives: Vec::new(),
                    issue: format!("Phone format inconsistent: {value}"),
                    confidence: 0.85,
                    description: "Standardize to +XX-XXXXXXXXXX format".to_string(),
                });
            }
        }
        None
    }
}

fn email(value: &str) -> Option<Proposal> {
    let spaced = value
        .char_indices()
        .filter(|(_, c)| *c == '@')
        .any(|(idx, _)| {
            value[..idx].ends_with(char::is_whitespace)
                || value[idx + 1..].starts_with(char::is_whitespace)
        });
    if !spaced {
        return None;
    }
    let suggested = AT_SPACING.as_ref()?.replace_all(value.trim(), "@").into_owned();
    Some(Proposal {
        kind: FixKind::EmailSpacingFix,
        suggested,
        alternatives: Vec::new(),
        issue: format!("Email has spacing issues: {value}"),
        confidence: 0.95,
        description: "Remove extra spaces around @".to_string(),
    })
}

fn postal(value: &str) -> Option<Proposal> {
    let value = value.trim();
    let parts = POSTAL_PLACEHOLDER.as_ref()?.captures(value)?;
    let (head, tail) = (&parts[1], &parts[2]);
    let options: Vec<String> = POSTAL_SUBSTITUTIONS
        .iter()
        .map(|digits| format!("{head}{digits}{tail}"))
        .collect();
    Some(Proposal {
        kind: FixKind::PostalXxPattern,
        suggested: options[0].clone(),
        alternatives: options,
        issue: format!("Postal code has XX pattern: {value}"),
        confidence: 0.7,
        description: "Replace XX with specific digits".to_string(),
    })
}

fn date(value: &str) -> Option<Proposal> {
    let value = value.trim();
    if matches(&ISO_SHAPE, value) {
        return None;
    }
    let parsed = parse_with_formats(value, FIX_DATE_FORMATS)?;
    Some(Proposal {
        kind: FixKind::DateFormatStandardize,
        suggested: parsed.format(ISO_DATE).to_string(),
        alternatives: Vec::new(),
        issue: format!("Date format non-standard: {value}"),
        confidence: 0.9,
        description: "Convert to ISO format (YYYY-MM-DD)".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detector() -> FixDetector {
        FixDetector::default()
    }

    #[test]
    fn bare_ten_digit_phone_gets_country_code() {
        let proposal = detector().phone("9000156794").unwrap();
        assert_eq!(proposal.kind, FixKind::PhoneMissingCountryCode);
        assert_eq!(proposal.suggested, "+91-9000156794");
        assert!((proposal.confidence - 0.9).abs() < f32::EPSILON);
    }

    #[test]
    fn plus_prefixed_phone_is_reformatted() {
        let proposal = detector().phone("+919000156794").unwrap();
        assert_eq!(proposal.kind, FixKind::PhoneFormatFix);
        assert_eq!(proposal.suggested, "+91-9000156794");
        assert!(detector().phone("+91-9000156794").is_none());
        assert!(detector().phone("+1-555").is_none());
        assert!(detector().phone("12345").is_none());
    }

    #[test]
    fn email_spacing_around_at() {
        let proposal = email("asha @ example.com").unwrap();
        assert_eq!(proposal.suggested, "asha@example.com");
        assert!(email("asha@example.com").is_none());
        assert!(email("asha rao@example.com").is_none());
    }

    #[test]
    fn postal_placeholder_offers_substitutions() {
        let proposal = postal("667XX2").unwrap();
        assert_eq!(proposal.suggested, "667002");
        assert_eq!(proposal.alternatives, ["667002", "667012", "667102"]);
        assert_eq!(postal("667xx2").unwrap().suggested, "667002");
        assert_eq!(postal(" 56xX01 ").unwrap().alternatives[2], "561001");
        assert!(postal("XX1234").is_none());
        assert!(postal("66XXX2").is_none());
        assert!(postal("560001").is_none());
    }

    #[test]
    fn dates_try_alternate_layouts() {
        assert_eq!(date("Mar 25, 2025").unwrap().suggested, "2025-03-25");
        assert_eq!(date("25/03/2025").unwrap().suggested, "2025-03-25");
        assert!(date("2025-03-25").is_none());
        assert!(date("someday").is_none());
    }
}
