use recon_model::{FixKind, ModelError};
use thiserror::Error;

use crate::ledger::EntryId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error("fix for {column} row {row} is stale: the cell no longer holds the detected value")]
    Stale { column: String, row: usize },
    #[error("no ledger entry {0}")]
    UnknownEntry(EntryId),
    #[error("entry {id} is superseded at {column} row {row}{}", .by.map(|b| format!(" by entry {b}")).unwrap_or_default())]
    Superseded {
        id: EntryId,
        by: Option<EntryId>,
        column: String,
        row: usize,
    },
    #[error("'{alternative}' is not an offered alternative for {kind}")]
    UnknownAlternative { kind: FixKind, alternative: String },
    #[error("bulk application needs at least one fix")]
    EmptyBulk,
    #[error("bulk application touches {column} row {row} more than once")]
    DuplicateCell { column: String, row: usize },
}
