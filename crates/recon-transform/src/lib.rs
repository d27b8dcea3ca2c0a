//! Value normalization and table cleaning.
//!
//! - **inference**: column type sampling for the matcher's type bonus
//! - **normalization**: date, numeric and text helpers
//! - **handlers**: normalize/validate pair per field kind
//! - **cleaner**: table-wide cleaning with cross-field defaults
//! - **output**: CSV artifact writer

#![deny(unsafe_code)]

pub mod cleaner;
pub mod error;
pub mod handlers;
pub mod inference;
pub mod normalization;
pub mod output;

pub use cleaner::{CleanOutcome, Cleaner, ISSUE_SAMPLE_LIMIT};
pub use error::{Result, TransformError};
pub use handlers::{FieldHandler, handler, normalize_value};
pub use inference::{infer_table, infer_type};
pub use output::{render_csv, write_csv, write_csv_file};
