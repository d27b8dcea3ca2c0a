use std::io::Read;
use std::path::Path;

use csv::ReaderBuilder;
use recon_model::{CellValue, Table};
use tracing::debug;

use crate::error::IngestError;

fn normalize_header(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('\u{feff}');
    trimmed.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Header names made unique: blanks become `Unnamed: N`, repeats get `.1`, `.2`, ...
fn dedupe_headers(raw: &[String]) -> Vec<String> {
    let mut headers: Vec<String> = Vec::with_capacity(raw.len());
    for (idx, value) in raw.iter().enumerate() {
        let base = if value.is_empty() {
            format!("Unnamed: {idx}")
        } else {
            value.clone()
        };
        let mut candidate = base.clone();
        let mut suffix = 1;
        while headers.contains(&candidate) {
            candidate = format!("{base}.{suffix}");
            suffix += 1;
        }
        headers.push(candidate);
    }
    headers
}

fn cell_from_raw(raw: &str) -> CellValue {
    if raw.is_empty() {
        CellValue::Missing
    } else {
        CellValue::Text(raw.to_string())
    }
}

/// Read a CSV source into a working table. The first row is the header.
///
/// Empty fields become [`CellValue::Missing`]; other values are kept
/// verbatim for the cleaner. Short records are padded, long records are an
/// error because the column they belong to is unknown.
pub fn read_table_from_reader<R: Read>(
    reader: R,
    source_name: &str,
) -> Result<Table, IngestError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);
    let csv_error = |e: csv::Error| IngestError::Csv {
        source_name: source_name.to_string(),
        message: e.to_string(),
    };

    let mut records = reader.records();
    let header_record = loop {
        match records.next() {
            Some(record) => {
                let record = record.map_err(csv_error)?;
                if record.iter().all(|value| value.trim().is_empty()) {
                    continue;
                }
                break record;
            }
            None => {
                return Err(IngestError::Empty {
                    source_name: source_name.to_string(),
                });
            }
        }
    };
    let raw_headers: Vec<String> = header_record.iter().map(normalize_header).collect();
    let headers = dedupe_headers(&raw_headers);
    let width = headers.len();

    let mut table = Table::new(headers).map_err(|e| IngestError::Csv {
        source_name: source_name.to_string(),
        message: e.to_string(),
    })?;
    for record in records {
        let record = record.map_err(csv_error)?;
        if record.iter().all(|value| value.trim().is_empty()) {
            continue;
        }
        if record.len() > width {
            return Err(IngestError::RaggedRow {
                source_name: source_name.to_string(),
                line: record.position().map_or(0, csv::Position::line),
                expected: width,
                found: record.len(),
            });
        }
        table.push_row(record.iter().map(cell_from_raw).collect());
    }
    debug!(
        source = source_name,
        columns = table.width(),
        rows = table.height(),
        "read source table"
    );
    Ok(table)
}

pub fn read_table(path: &Path) -> Result<Table, IngestError> {
    let file = std::fs::File::open(path).map_err(|source| IngestError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    read_table_from_reader(file, &path.display().to_string())
}
