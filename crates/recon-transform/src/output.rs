//! CSV rendering of cleaned tables.
//!
//! Every field is quoted and missing cells are written as the configured
//! marker so they stay distinguishable from empty strings.

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use csv::{QuoteStyle, WriterBuilder};
use recon_model::{CellValue, Table};
use tracing::info;

use crate::error::Result;

/// Write `table` as CSV to any writer.
pub fn write_csv<W: Write>(table: &Table, writer: W, missing_marker: &str) -> Result<()> {
    let mut csv = WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .from_writer(writer);
    csv.write_record(table.columns())?;
    for row in table.rows() {
        csv.write_record(row.iter().map(|cell| match cell {
            CellValue::Text(text) => text.as_str(),
            CellValue::Missing => missing_marker,
        }))?;
    }
    csv.flush()?;
    Ok(())
}

/// Render `table` as a CSV string.
pub fn render_csv(table: &Table, missing_marker: &str) -> Result<String> {
    let mut buffer = Vec::new();
    write_csv(table, &mut buffer, missing_marker)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

/// Write `table` to `path`, creating parent directories.
pub fn write_csv_file(table: &Table, path: &Path, missing_marker: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let file = File::create(path)?;
    write_csv(table, file, missing_marker)?;
    info!(path = %path.display(), rows = table.height(), "wrote cleaned table");
    Ok(())
}
