use std::fmt;

use serde::{Deserialize, Serialize};

use crate::field::FieldKind;

/// Coarse classification of a column's sampled values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InferredType {
    Date,
    Numeric,
    String,
    Empty,
}

impl InferredType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InferredType::Date => "date",
            InferredType::Numeric => "numeric",
            InferredType::String => "string",
            InferredType::Empty => "empty",
        }
    }

    /// Whether values of this type suit a field of `kind`.
    pub fn is_compatible_with(&self, kind: FieldKind) -> bool {
        match self {
            InferredType::Date => kind == FieldKind::Date,
            InferredType::Numeric => kind.is_numeric(),
            InferredType::String | InferredType::Empty => false,
        }
    }
}

impl fmt::Display for InferredType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Signal that produced a mapping suggestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    Heuristic,
    Learned,
    Promoted,
    Fallback,
    /// Set by hand in the current session.
    Manual,
}

impl Provenance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provenance::Heuristic => "heuristic",
            Provenance::Learned => "learned",
            Provenance::Promoted => "promoted",
            Provenance::Fallback => "fallback",
            Provenance::Manual => "manual",
        }
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A component contributing to a heuristic score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreComponent {
    /// Component name (e.g., "Name similarity").
    pub name: &'static str,
    pub value: f32,
    pub description: String,
}

/// Proposed mapping for one source column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MappingSuggestion {
    pub source_column: String,
    /// Target field, or `None` when the column stays unmapped.
    pub target: Option<String>,
    /// Reported confidence in `[0, 1]`.
    pub confidence: f32,
    pub provenance: Provenance,
    pub inferred_type: InferredType,
    /// Known variation that matched best, if any.
    pub matched_variation: Option<String>,
    /// Score breakdown for heuristic suggestions.
    pub explanation: Vec<ScoreComponent>,
}

impl MappingSuggestion {
    pub fn unmapped(source_column: impl Into<String>, inferred_type: InferredType) -> Self {
        Self {
            source_column: source_column.into(),
            target: None,
            confidence: 0.0,
            provenance: Provenance::Heuristic,
            inferred_type,
            matched_variation: None,
            explanation: Vec::new(),
        }
    }

    pub fn is_mapped(&self) -> bool {
        self.target.is_some()
    }

    /// Human-readable explanation of the score.
    pub fn explain(&self) -> String {
        if self.explanation.is_empty() {
            return self.provenance.to_string();
        }
        self.explanation
            .iter()
            .map(|c| format!("{}: {:.0}%", c.name, c.value * 100.0))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// A source column bound to the output column it feeds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnBinding {
    pub source_column: String,
    /// Canonical field name or promoted output name.
    pub output: String,
    /// `None` for promoted extras outside the canonical schema.
    pub kind: Option<FieldKind>,
}

impl ColumnBinding {
    pub fn is_canonical(&self) -> bool {
        self.kind.is_some()
    }
}
