//! Header matcher implementation.
//!
//! Source columns are assigned to canonical fields one-to-one in phases:
//!
//! 1. learned overrides from the rule store,
//! 2. kept (promoted) columns,
//! 3. heuristic scoring of every remaining column/field pair, resolved
//!    greedily by descending score with a stable tie-break,
//! 4. the fallback classifier for whatever is still unplaced.
//!
//! Within a phase, columns are visited in priority order: headers that match
//! a field or one of its variations exactly come first, then lexical order.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use recon_model::{
    CanonicalSchema, InferredType, MappingSuggestion, MatcherOptions, Provenance, RuleSet,
};
use recon_standards::VariationTable;
use tracing::{debug, warn};

use crate::fallback::{FallbackMatcher, NoFallback};
use crate::score::{FieldScore, score_field};
use crate::store::RuleStore;
use crate::utils::same_header;

/// A source column and the type inferred from its values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnProfile {
    pub name: String,
    pub inferred_type: InferredType,
}

impl ColumnProfile {
    pub fn new(name: impl Into<String>, inferred_type: InferredType) -> Self {
        Self {
            name: name.into(),
            inferred_type,
        }
    }
}

struct Candidate {
    column: usize,
    score: FieldScore,
}

/// Engine for mapping source headers to canonical fields.
pub struct HeaderMatcher {
    schema: CanonicalSchema,
    variations: VariationTable,
    rules: RuleSet,
    options: MatcherOptions,
    fallback: Box<dyn FallbackMatcher>,
}

impl HeaderMatcher {
    pub fn new(schema: CanonicalSchema, variations: VariationTable, options: MatcherOptions) -> Self {
        Self {
            schema,
            variations,
            rules: RuleSet::default(),
            options,
            fallback: Box::new(NoFallback),
        }
    }

    pub fn with_rules(mut self, rules: RuleSet) -> Self {
        self.rules = rules;
        self
    }

    /// Snapshot the store's rules; later promotions need a new matcher.
    pub fn with_store(self, store: &dyn RuleStore) -> Self {
        let rules = store.load();
        self.with_rules(rules)
    }

    pub fn with_fallback(mut self, fallback: Box<dyn FallbackMatcher>) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn schema(&self) -> &CanonicalSchema {
        &self.schema
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn options(&self) -> &MatcherOptions {
        &self.options
    }

    /// Heuristic score of one column against one field, if the field exists.
    pub fn score(&self, column: &ColumnProfile, field: &str) -> Option<FieldScore> {
        let field = self.schema.get(field)?;
        Some(score_field(
            &column.name,
            column.inferred_type,
            field,
            &self.variations,
            &self.options,
        ))
    }

    fn is_exact_header(&self, header: &str) -> bool {
        self.schema.fields().iter().any(|field| {
            same_header(header, &field.name)
                || self
                    .variations
                    .variations_for(&field.name)
                    .iter()
                    .any(|v| same_header(header, v))
        })
    }

    /// Column indices in processing order.
    fn processing_order(&self, columns: &[ColumnProfile]) -> Vec<usize> {
        let mut keyed: Vec<(bool, String, usize)> = columns
            .iter()
            .enumerate()
            .map(|(idx, c)| (!self.is_exact_header(&c.name), c.name.to_lowercase(), idx))
            .collect();
        keyed.sort();
        keyed.into_iter().map(|(_, _, idx)| idx).collect()
    }

    /// Suggest a mapping for every source column.
    ///
    /// Returns exactly one suggestion per column, sorted by descending
    /// confidence (ties keep input order). Accepted targets are unique.
    pub fn match_columns(&self, columns: &[ColumnProfile]) -> Vec<MappingSuggestion> {
        let order = self.processing_order(columns);
        let rank: Vec<usize> = {
            let mut rank = vec![0; columns.len()];
            for (pos, idx) in order.iter().enumerate() {
                rank[*idx] = pos;
            }
            rank
        };
        let mut results: Vec<Option<MappingSuggestion>> = vec![None; columns.len()];
        let mut claimed: BTreeSet<String> = BTreeSet::new();

        // Phase 1: learned overrides.
        for &idx in &order {
            let column = &columns[idx];
            let Some(learned) = self.rules.learned_for(&column.name) else {
                continue;
            };
            let Some(field) = self.schema.get(&learned.target_column) else {
                warn!(
                    column = %column.name,
                    target = %learned.target_column,
                    "learned target is not a canonical field"
                );
                continue;
            };
            if claimed.contains(&field.name) {
                debug!(column = %column.name, target = %field.name, "learned target already claimed");
                continue;
            }
            claimed.insert(field.name.clone());
            results[idx] = Some(MappingSuggestion {
                source_column: column.name.clone(),
                target: Some(field.name.clone()),
                confidence: learned.confidence.clamp(0.0, 1.0),
                provenance: Provenance::Learned,
                inferred_type: column.inferred_type,
                matched_variation: None,
                explanation: Vec::new(),
            });
        }

        // Phase 2: kept columns.
        for &idx in &order {
            if results[idx].is_some() {
                continue;
            }
            let column = &columns[idx];
            let Some(output) = self.rules.promotion_for(&column.name) else {
                continue;
            };
            let target = match self.schema.get(output) {
                Some(field) => field.name.clone(),
                None => output.to_string(),
            };
            if claimed.contains(&target) {
                debug!(column = %column.name, target = %target, "kept output already claimed");
                continue;
            }
            claimed.insert(target.clone());
            results[idx] = Some(MappingSuggestion {
                source_column: column.name.clone(),
                target: Some(target),
                confidence: self.options.promoted_confidence,
                provenance: Provenance::Promoted,
                inferred_type: column.inferred_type,
                matched_variation: None,
                explanation: Vec::new(),
            });
        }

        // Phase 3: score all remaining pairs, then claim greedily.
        let mut candidates: Vec<Candidate> = Vec::new();
        let mut best_rejected: Vec<Option<FieldScore>> = vec![None; columns.len()];
        for &idx in &order {
            if results[idx].is_some() {
                continue;
            }
            let column = &columns[idx];
            for field in self.schema.fields() {
                if claimed.contains(&field.name) {
                    continue;
                }
                let score = score_field(
                    &column.name,
                    column.inferred_type,
                    field,
                    &self.variations,
                    &self.options,
                );
                debug!(
                    column = %column.name,
                    field = %field.name,
                    score = score.raw,
                    "scored candidate"
                );
                candidates.push(Candidate { column: idx, score });
            }
        }
        candidates.sort_by(|a, b| {
            b.score
                .raw
                .total_cmp(&a.score.raw)
                .then_with(|| rank[a.column].cmp(&rank[b.column]))
                .then_with(|| a.score.position.cmp(&b.score.position))
        });

        for candidate in candidates {
            let idx = candidate.column;
            if results[idx].is_some() || claimed.contains(&candidate.score.field) {
                continue;
            }
            if candidate.score.raw < self.options.acceptance_threshold {
                let slot = &mut best_rejected[idx];
                if slot.is_none() {
                    *slot = Some(candidate.score);
                }
                continue;
            }
            claimed.insert(candidate.score.field.clone());
            let column = &columns[idx];
            results[idx] = Some(MappingSuggestion {
                source_column: column.name.clone(),
                target: Some(candidate.score.field.clone()),
                confidence: candidate.score.confidence(),
                provenance: Provenance::Heuristic,
                inferred_type: column.inferred_type,
                matched_variation: candidate.score.matched_variation,
                explanation: candidate.score.explanation,
            });
        }

        // Phase 4: fallback for what is left.
        for &idx in &order {
            if results[idx].is_some() {
                continue;
            }
            let column = &columns[idx];
            let mut suggestion = MappingSuggestion::unmapped(&column.name, column.inferred_type);
            if let Some(best) = best_rejected[idx].take() {
                suggestion.matched_variation = best.matched_variation;
                suggestion.explanation = best.explanation;
            }
            if self.fallback.is_available() {
                suggestion = self.classify_with_fallback(column, &claimed, suggestion);
                if let Some(target) = &suggestion.target {
                    claimed.insert(target.clone());
                }
            }
            results[idx] = Some(suggestion);
        }

        let mut suggestions: Vec<MappingSuggestion> = results.into_iter().flatten().collect();
        suggestions.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(Ordering::Equal)
        });
        suggestions
    }

    fn classify_with_fallback(
        &self,
        column: &ColumnProfile,
        claimed: &BTreeSet<String>,
        unmapped: MappingSuggestion,
    ) -> MappingSuggestion {
        let candidates: Vec<String> = self
            .schema
            .names()
            .filter(|name| !claimed.contains(*name))
            .map(str::to_string)
            .collect();
        let verdict = match self.fallback.classify(&column.name, &candidates) {
            Ok(verdict) => verdict,
            Err(error) => {
                warn!(column = %column.name, %error, "fallback classifier failed");
                return MappingSuggestion {
                    provenance: Provenance::Fallback,
                    ..unmapped
                };
            }
        };
        let target = match verdict.suggested {
            None => None,
            Some(suggested) => match candidates.iter().find(|c| same_header(c, &suggested)) {
                Some(field) => Some(field.clone()),
                None => {
                    warn!(
                        column = %column.name,
                        suggested = %suggested,
                        "fallback suggested an unavailable field"
                    );
                    return MappingSuggestion {
                        provenance: Provenance::Fallback,
                        ..unmapped
                    };
                }
            },
        };
        MappingSuggestion {
            confidence: verdict.confidence.clamp(0.0, 1.0),
            target,
            provenance: Provenance::Fallback,
            ..unmapped
        }
    }
}
