use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Pattern a targeted fix corrects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixKind {
    PhoneMissingCountryCode,
    PhoneFormatFix,
    EmailSpacingFix,
    PostalXxPattern,
    DateFormatStandardize,
}

impl FixKind {
    pub const ALL: [FixKind; 5] = [
        FixKind::PhoneMissingCountryCode,
        FixKind::PhoneFormatFix,
        FixKind::EmailSpacingFix,
        FixKind::PostalXxPattern,
        FixKind::DateFormatStandardize,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FixKind::PhoneMissingCountryCode => "phone_missing_country_code",
            FixKind::PhoneFormatFix => "phone_format_fix",
            FixKind::EmailSpacingFix => "email_spacing_fix",
            FixKind::PostalXxPattern => "postal_xx_pattern",
            FixKind::DateFormatStandardize => "date_format_standardize",
        }
    }
}

impl fmt::Display for FixKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FixKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FixKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s.trim())
            .ok_or_else(|| format!("unknown fix type: {s}"))
    }
}

/// A row-level correction proposal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetedFix {
    pub kind: FixKind,
    pub column: String,
    pub row: usize,
    pub current_value: String,
    pub suggested_fix: String,
    /// Other candidate values; the suggestion is always the first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alternatives: Vec<String>,
    pub issue: String,
    pub confidence: f32,
    pub fix_description: String,
}

/// Blanket normalization rule applied to a whole column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CleaningRuleKind {
    WhitespaceCleanup,
    NullTokens,
    IdentifierNormalize,
    AmountParse,
    PercentageParse,
    DateStandardize,
    PhoneStrip,
    EmailNormalize,
    PostalPlaceholder,
    AddressBackfill,
    DefaultFill,
    CountryNormalize,
    CurrencyNormalize,
}

impl CleaningRuleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CleaningRuleKind::WhitespaceCleanup => "whitespace_cleanup",
            CleaningRuleKind::NullTokens => "null_tokens",
            CleaningRuleKind::IdentifierNormalize => "identifier_normalize",
            CleaningRuleKind::AmountParse => "amount_parse",
            CleaningRuleKind::PercentageParse => "percentage_parse",
            CleaningRuleKind::DateStandardize => "date_standardize",
            CleaningRuleKind::PhoneStrip => "phone_strip",
            CleaningRuleKind::EmailNormalize => "email_normalize",
            CleaningRuleKind::PostalPlaceholder => "postal_placeholder",
            CleaningRuleKind::AddressBackfill => "address_backfill",
            CleaningRuleKind::DefaultFill => "default_fill",
            CleaningRuleKind::CountryNormalize => "country_normalize",
            CleaningRuleKind::CurrencyNormalize => "currency_normalize",
        }
    }
}

impl fmt::Display for CleaningRuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Record of a blanket rule firing on a column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleaningIssue {
    pub column: String,
    pub rule: CleaningRuleKind,
    pub before_sample: Vec<String>,
    pub after_sample: Vec<String>,
    /// Number of cells the rule changed.
    pub changed: usize,
    pub confidence: f32,
}

/// Before/after counts for one cleaned field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldReport {
    pub field: String,
    pub source_column: String,
    pub total: usize,
    pub missing_before: usize,
    pub missing_after: usize,
    pub invalid_after: usize,
}
