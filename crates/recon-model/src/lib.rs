pub mod error;
pub mod field;
pub mod fix;
pub mod mapping;
pub mod options;
pub mod rules;
pub mod table;

pub use error::{ModelError, Result};
pub use field::{CanonicalField, CanonicalSchema, FieldKind};
pub use fix::{CleaningIssue, CleaningRuleKind, FieldReport, FixKind, TargetedFix};
pub use mapping::{ColumnBinding, InferredType, MappingSuggestion, Provenance, ScoreComponent};
pub use options::{CleaningOptions, FallbackOptions, MatcherOptions, ReconConfig};
pub use rules::{
    CleaningRule, DefaultValueRule, LearnedMapping, RULE_TYPE_CONSTANT, RULE_TYPE_CURRENT_DATE,
    RuleSet,
};
pub use table::{CellValue, Table};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_rejects_duplicate_fields() {
        let result = CanonicalSchema::new([
            ("order_id", "Unique order identifier", FieldKind::Text),
            ("Order_ID", "again", FieldKind::Text),
        ]);
        assert_eq!(result, Err(ModelError::DuplicateField("Order_ID".to_string())));
    }

    #[test]
    fn schema_assigns_positions_in_order() {
        let schema = CanonicalSchema::new([
            ("order_id", "", FieldKind::Text),
            ("order_date", "", FieldKind::Date),
        ])
        .unwrap();
        assert_eq!(schema.get("ORDER_DATE").map(|f| f.position), Some(1));
        assert_eq!(schema.kind_of("order_date"), Some(FieldKind::Date));
    }

    #[test]
    fn field_kind_parses_loosely() {
        assert_eq!("Postal Code".parse::<FieldKind>(), Ok(FieldKind::PostalCode));
        assert!("widget".parse::<FieldKind>().is_err());
    }

    #[test]
    fn numeric_type_is_compatible_with_amounts() {
        assert!(InferredType::Numeric.is_compatible_with(FieldKind::Amount));
        assert!(InferredType::Date.is_compatible_with(FieldKind::Date));
        assert!(!InferredType::String.is_compatible_with(FieldKind::Text));
    }

    #[test]
    fn cell_value_serializes_tagged() {
        let json = serde_json::to_string(&CellValue::text("x")).unwrap();
        assert_eq!(json, r#"{"kind":"Text","value":"x"}"#);
    }

    #[test]
    fn config_parses_partial_json() {
        let config: ReconConfig =
            serde_json::from_str(r#"{"matcher": {"acceptance_threshold": 0.4}}"#).unwrap();
        assert_eq!(config.matcher.acceptance_threshold, 0.4);
        assert_eq!(config.matcher.keyword_bonus, 0.3);
        assert_eq!(config.cleaning.default_currency, "INR");
    }
}
