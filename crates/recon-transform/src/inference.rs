//! Column type inference from sampled values.
//!
//! The inferred type only feeds the matcher's type bonus; it never decides a
//! mapping on its own.

use recon_model::{CellValue, InferredType, Table};

use crate::normalization::{is_numeric, parse_date_value};

/// Values examined per column.
pub const SAMPLE_SIZE: usize = 200;

/// Share of sampled values that must parse for a type to be chosen.
pub const TYPE_RATIO: f64 = 0.6;

/// Classify a column from its values.
///
/// Missing and blank cells are dropped, then up to [`SAMPLE_SIZE`] values are
/// tried as dates before numbers so compact dates like `20250809` are dates.
pub fn infer_type<'a>(values: impl IntoIterator<Item = &'a CellValue>) -> InferredType {
    let sample: Vec<&str> = values
        .into_iter()
        .filter_map(CellValue::as_text)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .take(SAMPLE_SIZE)
        .collect();
    if sample.is_empty() {
        return InferredType::Empty;
    }
    let total = sample.len() as f64;
    let dates = sample
        .iter()
        .filter(|v| parse_date_value(v, true).is_some())
        .count();
    if dates as f64 / total > TYPE_RATIO {
        return InferredType::Date;
    }
    let numbers = sample.iter().filter(|v| is_numeric(v)).count();
    if numbers as f64 / total > TYPE_RATIO {
        InferredType::Numeric
    } else {
        InferredType::String
    }
}

/// Infer the type of every column of a table, in column order.
pub fn infer_table(table: &Table) -> Vec<(String, InferredType)> {
    table
        .columns()
        .iter()
        .map(|name| {
            let ty = table
                .column_values(name)
                .map_or(InferredType::Empty, infer_type);
            (name.clone(), ty)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(values: &[&str]) -> Vec<CellValue> {
        values.iter().map(|v| CellValue::text(*v)).collect()
    }

    #[test]
    fn compact_dates_beat_numbers() {
        assert_eq!(infer_type(&cells(&["20250809", "20250810", "20250811"])), InferredType::Date);
    }

    #[test]
    fn numbers_with_separators() {
        assert_eq!(infer_type(&cells(&["1,234", "12.5", "7", "n/a"])), InferredType::Numeric);
    }

    #[test]
    fn mixed_values_are_strings() {
        assert_eq!(infer_type(&cells(&["abc", "12", "def"])), InferredType::String);
    }

    #[test]
    fn nothing_present_is_empty() {
        let values = vec![CellValue::Missing, CellValue::text("  ")];
        assert_eq!(infer_type(&values), InferredType::Empty);
    }

    #[test]
    fn exactly_sixty_percent_is_not_enough() {
        assert_eq!(
            infer_type(&cells(&["1", "2", "3", "x", "y"])),
            InferredType::String
        );
    }
}
