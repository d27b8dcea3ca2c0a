use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("invalid canonical field name: {0:?}")]
    InvalidFieldName(String),
    #[error("duplicate canonical field: {0}")]
    DuplicateField(String),
    #[error("unknown field kind: {0}")]
    UnknownFieldKind(String),
    #[error("column not found: {0}")]
    ColumnNotFound(String),
    #[error("row {row} out of range (table has {len} rows)")]
    RowOutOfRange { row: usize, len: usize },
    #[error("duplicate column: {0}")]
    DuplicateColumn(String),
}

pub type Result<T> = std::result::Result<T, ModelError>;
