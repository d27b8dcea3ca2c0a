//! Mapping state management for review workflows.
//!
//! Tracks the accepted mapping for one source table: which source column
//! feeds each canonical field, plus extra columns kept verbatim. Target
//! uniqueness holds after every edit.

use std::collections::BTreeMap;

use recon_model::{CanonicalSchema, ColumnBinding, MappingSuggestion, Provenance};

use crate::error::MappingError;

/// An accepted `field <- source column` assignment.
#[derive(Debug, Clone, PartialEq)]
pub struct AcceptedMapping {
    pub source_column: String,
    pub confidence: f32,
    pub provenance: Provenance,
}

#[derive(Debug, Clone)]
pub struct MappingState {
    schema: CanonicalSchema,
    source_columns: Vec<String>,
    /// All suggestions from the matcher.
    pub suggestions: Vec<MappingSuggestion>,
    /// Canonical field -> accepted mapping.
    accepted: BTreeMap<String, AcceptedMapping>,
    /// Source column -> output name for kept extras.
    extras: BTreeMap<String, String>,
}

impl MappingState {
    /// Accept every mapped suggestion; non-canonical targets become kept extras.
    pub fn new(
        schema: CanonicalSchema,
        source_columns: Vec<String>,
        suggestions: Vec<MappingSuggestion>,
    ) -> Self {
        let mut state = Self {
            schema,
            source_columns,
            suggestions: Vec::new(),
            accepted: BTreeMap::new(),
            extras: BTreeMap::new(),
        };
        for suggestion in &suggestions {
            let Some(target) = &suggestion.target else {
                continue;
            };
            match state.schema.get(target) {
                Some(field) => {
                    if !state.accepted.contains_key(&field.name) {
                        state.accepted.insert(
                            field.name.clone(),
                            AcceptedMapping {
                                source_column: suggestion.source_column.clone(),
                                confidence: suggestion.confidence,
                                provenance: suggestion.provenance,
                            },
                        );
                    }
                }
                None if state.extras.values().any(|name| name == target) => {}
                None => {
                    state
                        .extras
                        .insert(suggestion.source_column.clone(), target.clone());
                }
            }
        }
        state.suggestions = suggestions;
        state
    }

    pub fn schema(&self) -> &CanonicalSchema {
        &self.schema
    }

    pub fn source_columns(&self) -> &[String] {
        &self.source_columns
    }

    pub fn accepted_for(&self, field: &str) -> Option<&AcceptedMapping> {
        let field = self.schema.get(field)?;
        self.accepted.get(&field.name)
    }

    /// Field currently fed by `source_column`, if any.
    pub fn field_for_column(&self, source_column: &str) -> Option<&str> {
        self.accepted
            .iter()
            .find(|(_, m)| m.source_column == source_column)
            .map(|(field, _)| field.as_str())
    }

    pub fn suggestion_for(&self, source_column: &str) -> Option<&MappingSuggestion> {
        self.suggestions
            .iter()
            .find(|s| s.source_column == source_column)
    }

    fn check_column(&self, source_column: &str) -> Result<(), MappingError> {
        if self.source_columns.iter().any(|c| c == source_column) {
            Ok(())
        } else {
            Err(MappingError::ColumnNotFound(source_column.to_string()))
        }
    }

    /// Map `source_column` to `field` by hand.
    ///
    /// Any previous holder of the field is displaced and any previous target
    /// of the column is released, so targets stay unique.
    pub fn accept_manual(&mut self, field: &str, source_column: &str) -> Result<(), MappingError> {
        let field_name = self
            .schema
            .get(field)
            .map(|f| f.name.clone())
            .ok_or_else(|| MappingError::FieldNotFound(field.to_string()))?;
        self.check_column(source_column)?;
        self.accepted.retain(|_, m| m.source_column != source_column);
        self.extras.remove(source_column);
        self.accepted.insert(
            field_name,
            AcceptedMapping {
                source_column: source_column.to_string(),
                confidence: 1.0,
                provenance: Provenance::Manual,
            },
        );
        Ok(())
    }

    /// Drop the accepted mapping for `field`. Returns whether one existed.
    pub fn clear_mapping(&mut self, field: &str) -> bool {
        let Some(name) = self.schema.get(field).map(|f| f.name.clone()) else {
            return false;
        };
        self.accepted.remove(&name).is_some()
    }

    /// Keep `source_column` verbatim under `output_name`.
    pub fn keep_extra(&mut self, source_column: &str, output_name: &str) -> Result<(), MappingError> {
        self.check_column(source_column)?;
        let output = output_name.trim();
        if let Some(field) = self.schema.get(output) {
            return Err(MappingError::OutputNameConflict {
                output: output.to_string(),
                holder: field.name.clone(),
            });
        }
        if let Some((holder, _)) = self
            .extras
            .iter()
            .find(|(source, name)| name.as_str() == output && source.as_str() != source_column)
        {
            return Err(MappingError::OutputNameConflict {
                output: output.to_string(),
                holder: holder.clone(),
            });
        }
        self.accepted.retain(|_, m| m.source_column != source_column);
        self.extras
            .insert(source_column.to_string(), output.to_string());
        Ok(())
    }

    /// Output bindings: canonical fields in schema order, then extras in source order.
    pub fn bindings(&self) -> Vec<ColumnBinding> {
        let mut bindings: Vec<ColumnBinding> = self
            .schema
            .fields()
            .iter()
            .filter_map(|field| {
                self.accepted.get(&field.name).map(|m| ColumnBinding {
                    source_column: m.source_column.clone(),
                    output: field.name.clone(),
                    kind: Some(field.kind),
                })
            })
            .collect();
        for column in &self.source_columns {
            if let Some(output) = self.extras.get(column) {
                bindings.push(ColumnBinding {
                    source_column: column.clone(),
                    output: output.clone(),
                    kind: None,
                });
            }
        }
        bindings
    }

    /// Source columns that feed nothing.
    pub fn unmapped_columns(&self) -> Vec<&str> {
        self.source_columns
            .iter()
            .filter(|c| {
                !self.extras.contains_key(*c) && !self.accepted.values().any(|m| &m.source_column == *c)
            })
            .map(String::as_str)
            .collect()
    }

    /// Canonical fields with no source column.
    pub fn unmapped_fields(&self) -> Vec<&str> {
        self.schema
            .names()
            .filter(|name| !self.accepted.contains_key(*name))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use recon_model::{FieldKind, InferredType};

    use super::*;

    fn schema() -> CanonicalSchema {
        CanonicalSchema::new([
            ("order_id", "", FieldKind::Text),
            ("email", "", FieldKind::Email),
        ])
        .unwrap()
    }

    fn suggestion(column: &str, target: Option<&str>) -> MappingSuggestion {
        MappingSuggestion {
            target: target.map(str::to_string),
            confidence: 0.9,
            ..MappingSuggestion::unmapped(column, InferredType::String)
        }
    }

    fn state() -> MappingState {
        MappingState::new(
            schema(),
            vec!["Order No".into(), "Mail".into(), "Coupon".into()],
            vec![
                suggestion("Order No", Some("order_id")),
                suggestion("Mail", None),
                suggestion("Coupon", Some("coupon_code")),
            ],
        )
    }

    #[test]
    fn new_accepts_mapped_and_keeps_extras() {
        let state = state();
        assert_eq!(
            state.accepted_for("order_id").map(|m| m.source_column.as_str()),
            Some("Order No")
        );
        let outputs: Vec<String> = state.bindings().into_iter().map(|b| b.output).collect();
        assert_eq!(outputs, ["order_id", "coupon_code"]);
        assert_eq!(state.unmapped_columns(), ["Mail"]);
    }

    #[test]
    fn accept_manual_displaces_previous_holder() {
        let mut state = state();
        state.accept_manual("order_id", "Mail").unwrap();
        assert_eq!(state.field_for_column("Mail"), Some("order_id"));
        assert_eq!(state.field_for_column("Order No"), None);
        assert_eq!(state.unmapped_columns(), ["Order No"]);

        state.accept_manual("email", "Mail").unwrap();
        assert!(state.accepted_for("order_id").is_none());
        assert_eq!(
            state.accepted_for("email").map(|m| m.provenance),
            Some(Provenance::Manual)
        );
    }

    #[test]
    fn accept_manual_rejects_unknown_names() {
        let mut state = state();
        assert_eq!(
            state.accept_manual("nope", "Mail"),
            Err(MappingError::FieldNotFound("nope".into()))
        );
        assert_eq!(
            state.accept_manual("email", "nope"),
            Err(MappingError::ColumnNotFound("nope".into()))
        );
    }

    #[test]
    fn keep_extra_rejects_canonical_names() {
        let mut state = state();
        assert!(matches!(
            state.keep_extra("Mail", "email"),
            Err(MappingError::OutputNameConflict { .. })
        ));
        assert!(matches!(
            state.keep_extra("Mail", "coupon_code"),
            Err(MappingError::OutputNameConflict { .. })
        ));
        state.keep_extra("Mail", "contact_raw").unwrap();
        assert!(state.unmapped_columns().is_empty());
    }

    #[test]
    fn new_keeps_first_holder_of_an_extra_name() {
        let state = MappingState::new(
            schema(),
            vec!["Coupon".into(), "Promo".into()],
            vec![
                suggestion("Coupon", Some("promo")),
                suggestion("Promo", Some("promo")),
            ],
        );
        let outputs: Vec<String> = state.bindings().into_iter().map(|b| b.output).collect();
        assert_eq!(outputs, ["promo"]);
        assert_eq!(state.unmapped_columns(), ["Promo"]);
    }

    #[test]
    fn clear_mapping_frees_field() {
        let mut state = state();
        assert!(state.clear_mapping("ORDER_ID"));
        assert!(!state.clear_mapping("order_id"));
        assert_eq!(state.unmapped_fields(), ["order_id", "email"]);
    }
}
