//! Promotion of fixes and cleaning issues to reusable cleaning rules, and
//! re-application of promoted rules on later runs.

use recon_map::{RuleStore, StoreError, timestamp};
use recon_model::{CleaningIssue, CleaningRule, FixKind, RuleSet, Table, TargetedFix};
use tracing::{info, warn};

use crate::error::LedgerError;
use crate::ledger::{EntryId, FixLedger};

/// Bulk key used when promoted rules are re-applied.
pub const PROMOTED_BULK_KEY: &str = "promoted_rules";

/// Pattern a promoted fix generalizes over, where one exists.
fn fix_pattern(kind: FixKind) -> Option<&'static str> {
    match kind {
        FixKind::PhoneMissingCountryCode => Some(r"^\d{10}$"),
        FixKind::PhoneFormatFix => Some(r"^\+\d{12}$"),
        FixKind::EmailSpacingFix => Some(r"\s*@\s*"),
        FixKind::PostalXxPattern => Some(r"(?i)^\d+xx\d+$"),
        FixKind::DateFormatStandardize => None,
    }
}

/// Generalize a targeted fix into a cleaning rule keyed by (fix type, column).
pub fn rule_from_fix(fix: &TargetedFix, created_at: impl Into<String>) -> CleaningRule {
    CleaningRule {
        rule_type: fix.kind.as_str().to_string(),
        target_column: fix.column.clone(),
        pattern: fix_pattern(fix.kind).map(str::to_string),
        replacement: fix.suggested_fix.clone(),
        description: fix.fix_description.clone(),
        confidence: fix.confidence,
        created_at: created_at.into(),
    }
}

/// Generalize a blanket cleaning issue into a cleaning rule.
pub fn rule_from_issue(issue: &CleaningIssue, created_at: impl Into<String>) -> CleaningRule {
    CleaningRule {
        rule_type: format!("issue_{}", issue.rule),
        target_column: issue.column.clone(),
        pattern: None,
        replacement: String::new(),
        description: format!("Promoted {} rule for {}", issue.rule, issue.column),
        confidence: issue.confidence,
        created_at: created_at.into(),
    }
}

/// Persist a fix as a rule. The fix need not have been applied.
pub fn promote_fix(store: &dyn RuleStore, fix: &TargetedFix) -> Result<RuleSet, StoreError> {
    store.promote_cleaning_rule(rule_from_fix(fix, timestamp()))
}

pub fn promote_issue(store: &dyn RuleStore, issue: &CleaningIssue) -> Result<RuleSet, StoreError> {
    store.promote_cleaning_rule(rule_from_issue(issue, timestamp()))
}

/// Fixes covered by a promoted rule for their (fix type, column).
pub fn covered_fixes<'a>(rules: &RuleSet, fixes: &'a [TargetedFix]) -> Vec<&'a TargetedFix> {
    fixes
        .iter()
        .filter(|fix| rules.cleaning_rule(fix.kind.as_str(), &fix.column).is_some())
        .collect()
}

/// Apply every fix covered by a promoted rule as one reversible bulk entry.
///
/// Returns `None` when no rule covers any fix.
pub fn apply_promoted(
    ledger: &mut FixLedger,
    table: &mut Table,
    rules: &RuleSet,
    fixes: &[TargetedFix],
) -> Result<Option<EntryId>, LedgerError> {
    let covered: Vec<TargetedFix> = covered_fixes(rules, fixes).into_iter().cloned().collect();
    if covered.is_empty() {
        return Ok(None);
    }
    match ledger.apply_bulk(table, PROMOTED_BULK_KEY, &covered) {
        Ok(id) => {
            info!(%id, fixes = covered.len(), "applied promoted cleaning rules");
            Ok(Some(id))
        }
        Err(err) => {
            warn!(error = %err, "promoted cleaning rules not applied");
            Err(err)
        }
    }
}
