//! Heuristic scoring of a source header against a canonical field.
//!
//! The score combines four signals:
//! - name similarity against the field identifier (indel ratio),
//! - the best similarity against the field's known variations, where an
//!   exact case-insensitive variation match scores a fixed high value,
//! - a keyword bonus when a token of the field identifier occurs in the header,
//! - a type bonus when the inferred column type suits the field kind.
//!
//! The raw score may exceed 1.0; it is capped only for reporting.

use rapidfuzz::distance::indel;
use recon_model::{CanonicalField, InferredType, MatcherOptions, ScoreComponent};
use recon_standards::VariationTable;

use crate::utils::{field_tokens, normalize_text, same_header};

/// Score for a single header/field pair.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldScore {
    pub field: String,
    pub position: usize,
    /// Uncapped sum of signals, used for ranking.
    pub raw: f32,
    /// Variation with the best similarity, if any beat the name itself.
    pub matched_variation: Option<String>,
    /// The header equals a variation (or the field name) ignoring case.
    pub exact: bool,
    pub explanation: Vec<ScoreComponent>,
}

impl FieldScore {
    /// Score capped to `[0, 1]` for reporting.
    pub fn confidence(&self) -> f32 {
        self.raw.clamp(0.0, 1.0)
    }
}

fn similarity(a: &str, b: &str) -> f32 {
    indel::normalized_similarity(normalize_text(a).chars(), normalize_text(b).chars()) as f32
}

/// Scores one header against one field.
pub fn score_field(
    header: &str,
    inferred: InferredType,
    field: &CanonicalField,
    variations: &VariationTable,
    options: &MatcherOptions,
) -> FieldScore {
    let mut explanation = Vec::with_capacity(4);

    let name_exact = same_header(header, &field.name);
    let base = if name_exact {
        1.0
    } else {
        similarity(header, &field.name)
    };
    explanation.push(ScoreComponent {
        name: "Name similarity",
        value: base,
        description: format!("'{header}' vs '{}'", field.name),
    });

    let mut variation_score = 0.0_f32;
    let mut matched_variation = None;
    let mut variation_exact = false;
    for variation in variations.variations_for(&field.name) {
        if same_header(header, variation) {
            variation_score = options.variation_exact_score;
            matched_variation = Some(variation.clone());
            variation_exact = true;
            break;
        }
        let score = similarity(header, variation);
        if score > variation_score {
            variation_score = score;
            matched_variation = Some(variation.clone());
        }
    }
    if let Some(variation) = &matched_variation {
        explanation.push(ScoreComponent {
            name: "Variation match",
            value: variation_score,
            description: if variation_exact {
                format!("exact variation '{variation}'")
            } else {
                format!("closest variation '{variation}'")
            },
        });
    }

    let mut raw = base.max(variation_score);
    if base >= variation_score && !variation_exact {
        matched_variation = None;
    }

    if !options.is_keyword_excluded(header) {
        let lower = header.to_lowercase();
        if let Some(token) = field_tokens(&field.name).find(|token| lower.contains(token.as_str()))
        {
            raw += options.keyword_bonus;
            explanation.push(ScoreComponent {
                name: "Keyword bonus",
                value: options.keyword_bonus,
                description: format!("header contains '{token}'"),
            });
        }
    }

    if inferred.is_compatible_with(field.kind) {
        raw += options.type_bonus;
        explanation.push(ScoreComponent {
            name: "Type bonus",
            value: options.type_bonus,
            description: format!("{inferred} values suit {} field", field.kind),
        });
    }

    FieldScore {
        field: field.name.clone(),
        position: field.position,
        raw,
        matched_variation,
        exact: name_exact || variation_exact,
        explanation,
    }
}

#[cfg(test)]
mod tests {
    use recon_model::FieldKind;

    use super::*;

    fn field(name: &str, kind: FieldKind) -> CanonicalField {
        CanonicalField {
            name: name.to_string(),
            description: String::new(),
            position: 0,
            kind,
        }
    }

    #[test]
    fn exact_variation_scores_fixed_value() {
        let score = score_field(
            "ORDER NO",
            InferredType::String,
            &field("order_id", FieldKind::Text),
            &VariationTable::builtin(),
            &MatcherOptions::default(),
        );
        assert!(score.exact);
        assert_eq!(score.matched_variation.as_deref(), Some("Order No"));
        // 0.95 variation + 0.3 keyword ("order")
        assert!((score.raw - 1.25).abs() < 1e-6);
        assert_eq!(score.confidence(), 1.0);
    }

    #[test]
    fn keyword_bonus_suppressed_for_excluded_prefix() {
        let options = MatcherOptions::default();
        let total = field("total_amount", FieldKind::Amount);
        let plain = score_field(
            "Total Paid",
            InferredType::String,
            &total,
            &VariationTable::default(),
            &options,
        );
        let coupon = score_field(
            "Coupon Total",
            InferredType::String,
            &total,
            &VariationTable::default(),
            &options,
        );
        assert!(plain.explanation.iter().any(|c| c.name == "Keyword bonus"));
        assert!(!coupon.explanation.iter().any(|c| c.name == "Keyword bonus"));
    }

    #[test]
    fn type_bonus_requires_compatible_kind() {
        let options = MatcherOptions::default();
        let table = VariationTable::default();
        let date_field = field("order_date", FieldKind::Date);
        let with = score_field("when", InferredType::Date, &date_field, &table, &options);
        let without = score_field("when", InferredType::Numeric, &date_field, &table, &options);
        assert!((with.raw - without.raw - options.type_bonus).abs() < 1e-6);
    }
}
