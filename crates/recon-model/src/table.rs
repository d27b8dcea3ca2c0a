use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};

/// A single cell. `Missing` is distinct from an empty string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value")]
pub enum CellValue {
    Text(String),
    Missing,
}

impl CellValue {
    pub fn text(value: impl Into<String>) -> Self {
        CellValue::Text(value.into())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(value) => Some(value.as_str()),
            CellValue::Missing => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, CellValue::Missing)
    }

    /// Missing, empty or whitespace-only.
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Text(value) => value.trim().is_empty(),
            CellValue::Missing => true,
        }
    }
}

impl From<Option<String>> for CellValue {
    fn from(value: Option<String>) -> Self {
        value.map_or(CellValue::Missing, CellValue::Text)
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

/// In-memory working table: named columns over row-major cells.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<CellValue>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Result<Self> {
        for (idx, column) in columns.iter().enumerate() {
            if columns[..idx].contains(column) {
                return Err(ModelError::DuplicateColumn(column.clone()));
            }
        }
        Ok(Self {
            columns,
            rows: Vec::new(),
        })
    }

    /// Build a table from string literals; `None` becomes [`CellValue::Missing`].
    pub fn from_rows(columns: &[&str], rows: &[Vec<Option<&str>>]) -> Result<Self> {
        let mut table = Table::new(columns.iter().map(|c| (*c).to_string()).collect())?;
        for row in rows {
            table.push_row(
                row.iter()
                    .map(|cell| cell.map_or(CellValue::Missing, CellValue::from))
                    .collect(),
            );
        }
        Ok(table)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Rows shorter than the header are padded with `Missing`, longer rows truncated.
    pub fn push_row(&mut self, mut row: Vec<CellValue>) {
        row.resize(self.columns.len(), CellValue::Missing);
        self.rows.push(row);
    }

    /// Append a column, filling every existing row with `fill`.
    pub fn push_column(&mut self, name: impl Into<String>, fill: CellValue) -> Result<()> {
        let name = name.into();
        if self.columns.contains(&name) {
            return Err(ModelError::DuplicateColumn(name));
        }
        self.columns.push(name);
        for row in &mut self.rows {
            row.push(fill.clone());
        }
        Ok(())
    }

    /// Iterate the cells of one column.
    pub fn column_values(&self, name: &str) -> Option<impl Iterator<Item = &CellValue>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(move |row| &row[idx]))
    }

    pub fn cell(&self, row: usize, column: &str) -> Result<&CellValue> {
        let col = self
            .column_index(column)
            .ok_or_else(|| ModelError::ColumnNotFound(column.to_string()))?;
        let len = self.rows.len();
        self.rows
            .get(row)
            .map(|r| &r[col])
            .ok_or(ModelError::RowOutOfRange { row, len })
    }

    /// Overwrite one cell, returning the prior value.
    pub fn set_cell(&mut self, row: usize, column: &str, value: CellValue) -> Result<CellValue> {
        let col = self
            .column_index(column)
            .ok_or_else(|| ModelError::ColumnNotFound(column.to_string()))?;
        let len = self.rows.len();
        let slot = self
            .rows
            .get_mut(row)
            .map(|r| &mut r[col])
            .ok_or(ModelError::RowOutOfRange { row, len })?;
        Ok(std::mem::replace(slot, value))
    }

    /// Count of missing-or-blank cells in a column.
    pub fn blank_count(&self, column: &str) -> usize {
        self.column_values(column)
            .map(|values| values.filter(|v| v.is_blank()).count())
            .unwrap_or(0)
    }
}
