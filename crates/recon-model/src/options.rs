//! Configuration options for mapping and cleaning.

use serde::{Deserialize, Serialize};

/// Options controlling header matching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherOptions {
    /// Minimum heuristic score accepted without the fallback.
    pub acceptance_threshold: f32,
    /// Score given to an exact (case-insensitive) variation match.
    pub variation_exact_score: f32,
    /// Bonus when a token of the field name occurs in the header.
    pub keyword_bonus: f32,
    /// Bonus when the inferred column type suits the field kind.
    pub type_bonus: f32,
    /// Confidence reported for kept columns.
    pub promoted_confidence: f32,
    /// Headers starting with one of these (case-insensitive) get no keyword bonus.
    pub keyword_exclusion_prefixes: Vec<String>,
}

impl Default for MatcherOptions {
    fn default() -> Self {
        Self {
            acceptance_threshold: 0.7,
            variation_exact_score: 0.95,
            keyword_bonus: 0.3,
            type_bonus: 0.2,
            promoted_confidence: 0.98,
            keyword_exclusion_prefixes: vec!["coupon".to_string()],
        }
    }
}

impl MatcherOptions {
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.acceptance_threshold = threshold.clamp(0.0, 1.0);
        self
    }

    pub fn is_keyword_excluded(&self, header: &str) -> bool {
        let lower = header.trim().to_lowercase();
        self.keyword_exclusion_prefixes
            .iter()
            .any(|prefix| !prefix.is_empty() && lower.starts_with(&prefix.to_lowercase()))
    }
}

/// Options controlling value cleaning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleaningOptions {
    pub default_country: String,
    pub default_currency: String,
    /// Prefix used when a phone number lacks a country code.
    pub phone_country_code: String,
    /// Values in postal columns that are not postal codes.
    pub postal_placeholder_tokens: Vec<String>,
    /// Read ambiguous numeric dates as day/month/year first.
    pub day_first: bool,
    /// Marker written for missing cells in output artifacts.
    pub missing_marker: String,
}

impl Default for CleaningOptions {
    fn default() -> Self {
        Self {
            default_country: "India".to_string(),
            default_currency: "INR".to_string(),
            phone_country_code: "+91".to_string(),
            postal_placeholder_tokens: ["SAVE10", "SAVE20", "DISCOUNT", "COUPON", "NAN"]
                .into_iter()
                .map(String::from)
                .collect(),
            day_first: true,
            missing_marker: "<NA>".to_string(),
        }
    }
}

impl CleaningOptions {
    pub fn is_postal_placeholder(&self, value: &str) -> bool {
        let upper = value.trim().to_uppercase();
        self.postal_placeholder_tokens
            .iter()
            .any(|token| token.eq_ignore_ascii_case(&upper))
    }
}

/// External fallback classifier settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackOptions {
    /// Program to run; no fallback when unset.
    pub command: Option<String>,
    pub args: Vec<String>,
    pub timeout_ms: u64,
}

impl Default for FallbackOptions {
    fn default() -> Self {
        Self {
            command: None,
            args: Vec::new(),
            timeout_ms: 5000,
        }
    }
}

/// Top-level configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconConfig {
    pub matcher: MatcherOptions,
    pub cleaning: CleaningOptions,
    pub fallback: FallbackOptions,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_exclusion_is_prefix_and_case_insensitive() {
        let options = MatcherOptions::default();
        assert!(options.is_keyword_excluded("Coupon Code"));
        assert!(options.is_keyword_excluded("coupon_total"));
        assert!(!options.is_keyword_excluded("Total"));
        assert!(!options.is_keyword_excluded("my coupon"));
    }

    #[test]
    fn placeholder_tokens_match_case_insensitively() {
        let options = CleaningOptions::default();
        assert!(options.is_postal_placeholder(" save10 "));
        assert!(options.is_postal_placeholder("nan"));
        assert!(!options.is_postal_placeholder("560001"));
    }

    #[test]
    fn threshold_is_clamped() {
        assert_eq!(MatcherOptions::default().with_threshold(1.5).acceptance_threshold, 1.0);
    }
}
