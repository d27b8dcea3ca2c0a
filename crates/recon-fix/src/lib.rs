//! Targeted fixes over cleaned tables.
//!
//! - **detector**: stateless pattern scan proposing row-level fixes
//! - **ledger**: apply/undo history with exact restoration
//! - **promotion**: fixes and issues saved as reusable cleaning rules

#![deny(unsafe_code)]

pub mod detector;
pub mod error;
pub mod ledger;
pub mod promotion;

pub use detector::{FIX_DATE_FORMATS, FixDetector, POSTAL_SUBSTITUTIONS};
pub use error::LedgerError;
pub use ledger::{CellChange, EntryId, FixLedger, LedgerEntry, LedgerScope};
pub use promotion::{
    PROMOTED_BULK_KEY, apply_promoted, covered_fixes, promote_fix, promote_issue, rule_from_fix,
    rule_from_issue,
};
