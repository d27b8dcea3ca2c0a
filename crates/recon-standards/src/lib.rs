#![deny(unsafe_code)]

pub mod error;
pub mod schema;
pub mod variations;

use std::path::PathBuf;

pub use crate::error::StandardsError;
pub use crate::schema::{builtin_schema, kind_for_field, load_schema, load_schema_or_builtin};
pub use crate::variations::VariationTable;

const STANDARDS_ENV_VAR: &str = "RECON_STANDARDS_DIR";

/// Directory holding the shipped reference tables.
pub fn default_standards_root() -> PathBuf {
    if let Ok(root) = std::env::var(STANDARDS_ENV_VAR) {
        return PathBuf::from(root);
    }
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../standards")
}

pub fn default_schema_path() -> PathBuf {
    default_standards_root().join("canonical_schema.csv")
}

pub fn default_variations_path() -> PathBuf {
    default_standards_root().join("header_variations.json")
}
