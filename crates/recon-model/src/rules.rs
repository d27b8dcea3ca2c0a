//! Persisted rule document.
//!
//! This is the JSON shape kept by a rule store: learned mappings, promoted
//! cleaning rules, kept columns and default values. Every section defaults to
//! empty so a partial or older file still loads.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A confirmed `source column -> canonical field` override.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearnedMapping {
    pub source_column: String,
    pub target_column: String,
    pub confidence: f32,
    #[serde(default = "default_transformation")]
    pub transformation: String,
    #[serde(default = "default_true")]
    pub learned: bool,
}

impl LearnedMapping {
    pub fn new(source_column: impl Into<String>, target_column: impl Into<String>) -> Self {
        Self {
            source_column: source_column.into(),
            target_column: target_column.into(),
            confidence: 1.0,
            transformation: default_transformation(),
            learned: true,
        }
    }

    pub fn matches_source(&self, column: &str) -> bool {
        self.source_column.trim().eq_ignore_ascii_case(column.trim())
    }
}

fn default_transformation() -> String {
    "direct".to_string()
}

fn default_true() -> bool {
    true
}

/// A fix or issue generalized for reuse on later runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleaningRule {
    #[serde(rename = "type")]
    pub rule_type: String,
    pub target_column: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    pub replacement: String,
    pub description: String,
    pub confidence: f32,
    pub created_at: String,
}

impl CleaningRule {
    /// Rules are identified by `(type, target column)`.
    pub fn same_key(&self, other: &CleaningRule) -> bool {
        self.rule_type == other.rule_type && self.target_column == other.target_column
    }
}

/// Default value for a column; `rule_type` selects how it is produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultValueRule {
    pub value: String,
    #[serde(default = "default_rule_type")]
    pub rule_type: String,
    pub created_at: String,
}

pub const RULE_TYPE_CURRENT_DATE: &str = "current_date";
pub const RULE_TYPE_CONSTANT: &str = "constant";

fn default_rule_type() -> String {
    RULE_TYPE_CURRENT_DATE.to_string()
}

impl DefaultValueRule {
    pub fn is_current_date(&self) -> bool {
        self.rule_type == RULE_TYPE_CURRENT_DATE
    }
}

/// Everything a rule store persists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleSet {
    pub mappings: Vec<LearnedMapping>,
    pub cleaning_rules: Vec<CleaningRule>,
    /// Source column -> output name for columns kept verbatim.
    pub column_promotions: BTreeMap<String, String>,
    pub default_values: BTreeMap<String, DefaultValueRule>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl RuleSet {
    pub fn learned_for(&self, column: &str) -> Option<&LearnedMapping> {
        self.mappings
            .iter()
            .rev()
            .find(|m| m.learned && m.matches_source(column))
    }

    /// Exact lookup of a kept column.
    pub fn promotion_for(&self, column: &str) -> Option<&str> {
        self.column_promotions.get(column).map(String::as_str)
    }

    /// Replace any mapping for the same source column.
    pub fn upsert_mapping(&mut self, mapping: LearnedMapping) {
        self.mappings
            .retain(|m| !m.matches_source(&mapping.source_column));
        self.mappings.push(mapping);
    }

    /// Replace any rule with the same `(type, target column)`.
    pub fn upsert_cleaning_rule(&mut self, rule: CleaningRule) {
        self.cleaning_rules.retain(|r| !r.same_key(&rule));
        self.cleaning_rules.push(rule);
    }

    pub fn cleaning_rule(&self, rule_type: &str, column: &str) -> Option<&CleaningRule> {
        self.cleaning_rules
            .iter()
            .find(|r| r.rule_type == rule_type && r.target_column == column)
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
            && self.cleaning_rules.is_empty()
            && self.column_promotions.is_empty()
            && self.default_values.is_empty()
    }
}
