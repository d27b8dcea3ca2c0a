//! Reversible history of applied fixes.
//!
//! The working table is the only mutable state. Each ledger entry records
//! the prior and applied value of every cell it touched, so undo restores
//! cells exactly and then removes the entry from history.

use std::fmt;

use recon_model::{CellValue, FixKind, Table, TargetedFix};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::LedgerError;

/// Identifier of a ledger entry, unique within one ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct EntryId(pub u64);

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Undo scope: single fixes are grouped by fix type, bulk entries by key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "scope", content = "key", rename_all = "snake_case")]
pub enum LedgerScope {
    Single(FixKind),
    Bulk(String),
}

impl fmt::Display for LedgerScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LedgerScope::Single(kind) => write!(f, "{kind}"),
            LedgerScope::Bulk(key) => write!(f, "bulk:{key}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CellChange {
    pub row: usize,
    pub column: String,
    pub prior: CellValue,
    pub applied: CellValue,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerEntry {
    pub id: EntryId,
    pub scope: LedgerScope,
    pub changes: Vec<CellChange>,
}

impl LedgerEntry {
    fn touches(&self, row: usize, column: &str) -> bool {
        self.changes
            .iter()
            .any(|change| change.row == row && change.column == column)
    }
}

#[derive(Debug, Clone, Default)]
pub struct FixLedger {
    entries: Vec<LedgerEntry>,
    next_id: u64,
}

impl FixLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: EntryId) -> Option<&LedgerEntry> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    /// Apply a fix's default suggestion.
    pub fn apply(&mut self, table: &mut Table, fix: &TargetedFix) -> Result<EntryId, LedgerError> {
        self.apply_value(table, fix, &fix.suggested_fix)
    }

    /// Apply one of the fix's alternatives instead of its default suggestion.
    pub fn apply_with(
        &mut self,
        table: &mut Table,
        fix: &TargetedFix,
        alternative: &str,
    ) -> Result<EntryId, LedgerError> {
        if alternative != fix.suggested_fix && !fix.alternatives.iter().any(|a| a == alternative) {
            return Err(LedgerError::UnknownAlternative {
                kind: fix.kind,
                alternative: alternative.to_string(),
            });
        }
        self.apply_value(table, fix, alternative)
    }

    fn apply_value(
        &mut self,
        table: &mut Table,
        fix: &TargetedFix,
        value: &str,
    ) -> Result<EntryId, LedgerError> {
        check_current(table, fix)?;
        let applied = CellValue::text(value);
        let prior = table.set_cell(fix.row, &fix.column, applied.clone())?;
        let id = self.push(
            LedgerScope::Single(fix.kind),
            vec![CellChange {
                row: fix.row,
                column: fix.column.clone(),
                prior,
                applied,
            }],
        );
        debug!(%id, kind = %fix.kind, column = %fix.column, row = fix.row, "applied fix");
        Ok(id)
    }

    /// Apply several fixes as one entry. Nothing changes unless every fix applies.
    pub fn apply_bulk(
        &mut self,
        table: &mut Table,
        key: impl Into<String>,
        fixes: &[TargetedFix],
    ) -> Result<EntryId, LedgerError> {
        if fixes.is_empty() {
            return Err(LedgerError::EmptyBulk);
        }
        for (idx, fix) in fixes.iter().enumerate() {
            check_current(table, fix)?;
            if fixes[..idx]
                .iter()
                .any(|other| other.row == fix.row && other.column == fix.column)
            {
                return Err(LedgerError::DuplicateCell {
                    column: fix.column.clone(),
                    row: fix.row,
                });
            }
        }
        let mut changes = Vec::with_capacity(fixes.len());
        for fix in fixes {
            let applied = CellValue::text(fix.suggested_fix.as_str());
            let prior = table.set_cell(fix.row, &fix.column, applied.clone())?;
            changes.push(CellChange {
                row: fix.row,
                column: fix.column.clone(),
                prior,
                applied,
            });
        }
        let key = key.into();
        let count = changes.len();
        let id = self.push(LedgerScope::Bulk(key.clone()), changes);
        info!(%id, key = %key, cells = count, "applied bulk fixes");
        Ok(id)
    }

    fn push(&mut self, scope: LedgerScope, changes: Vec<CellChange>) -> EntryId {
        self.next_id += 1;
        let id = EntryId(self.next_id);
        self.entries.push(LedgerEntry { id, scope, changes });
        id
    }

    /// Undo an entry, restoring every cell it changed, and drop it from history.
    ///
    /// Refuses when a later entry touched one of the same cells, or when a
    /// cell no longer holds the value this entry wrote.
    pub fn undo(&mut self, table: &mut Table, id: EntryId) -> Result<LedgerEntry, LedgerError> {
        let position = self
            .entries
            .iter()
            .position(|entry| entry.id == id)
            .ok_or(LedgerError::UnknownEntry(id))?;
        let entry = &self.entries[position];
        for change in &entry.changes {
            if let Some(later) = self.entries[position + 1..]
                .iter()
                .find(|later| later.touches(change.row, &change.column))
            {
                return Err(LedgerError::Superseded {
                    id,
                    by: Some(later.id),
                    column: change.column.clone(),
                    row: change.row,
                });
            }
            if table.cell(change.row, &change.column)? != &change.applied {
                return Err(LedgerError::Superseded {
                    id,
                    by: None,
                    column: change.column.clone(),
                    row: change.row,
                });
            }
        }
        let entry = self.entries.remove(position);
        for change in entry.changes.iter().rev() {
            table.set_cell(change.row, &change.column, change.prior.clone())?;
        }
        debug!(%id, scope = %entry.scope, cells = entry.changes.len(), "undid entry");
        Ok(entry)
    }

    /// Undo the most recent entry in `scope`, if there is one.
    pub fn undo_latest(
        &mut self,
        table: &mut Table,
        scope: &LedgerScope,
    ) -> Result<Option<LedgerEntry>, LedgerError> {
        let Some(id) = self
            .entries
            .iter()
            .rev()
            .find(|entry| &entry.scope == scope)
            .map(|entry| entry.id)
        else {
            return Ok(None);
        };
        self.undo(table, id).map(Some)
    }
}

/// A fix applies only while the cell still holds the value it was detected on.
fn check_current(table: &Table, fix: &TargetedFix) -> Result<(), LedgerError> {
    let current = table.cell(fix.row, &fix.column)?;
    if current.as_text() == Some(fix.current_value.as_str()) {
        Ok(())
    } else {
        Err(LedgerError::Stale {
            column: fix.column.clone(),
            row: fix.row,
        })
    }
}
