//! Canonical schema source.
//!
//! The schema is read from a CSV reference table with the columns
//! `canonical_name,description[,kind]`. Row order defines output order.
//! When no table is available the built-in order schema is used.

use std::collections::BTreeMap;
use std::path::Path;

use csv::ReaderBuilder;
use recon_model::{CanonicalSchema, FieldKind};
use tracing::{debug, warn};

use crate::error::StandardsError;

const BUILTIN_FIELDS: [(&str, &str); 24] = [
    ("order_id", "Unique order identifier"),
    ("order_date", "ISO date of order"),
    ("customer_id", "Internal customer id"),
    ("customer_name", "Full name"),
    ("email", "Contact email"),
    ("phone", "Contact phone"),
    ("billing_address", "Billing address line"),
    ("shipping_address", "Shipping address line"),
    ("city", "City"),
    ("state", "State/Province"),
    ("postal_code", "Zip/Postal/pin"),
    ("country", "Country"),
    ("product_sku", "SKU code"),
    ("product_name", "Item name"),
    ("category", "Category"),
    ("subcategory", "Subcategory if any"),
    ("quantity", "Units ordered"),
    ("unit_price", "Price per unit"),
    ("currency", "Currency code"),
    ("discount_pct", "Discount fraction (0-1)"),
    ("tax_pct", "Tax fraction (0-1)"),
    ("shipping_fee", "Shipping amount"),
    ("total_amount", "Total amount charged"),
    ("tax_id", "Tax/GST/VAT identifier"),
];

/// Field kind for a canonical field name when the schema table gives none.
pub fn kind_for_field(name: &str) -> FieldKind {
    match name.trim().to_lowercase().as_str() {
        "tax_id" => FieldKind::Identifier,
        "unit_price" | "shipping_fee" | "total_amount" => FieldKind::Amount,
        "discount_pct" | "tax_pct" => FieldKind::Percentage,
        "quantity" => FieldKind::Quantity,
        "order_date" => FieldKind::Date,
        "postal_code" => FieldKind::PostalCode,
        "phone" => FieldKind::Phone,
        "email" => FieldKind::Email,
        "billing_address" | "shipping_address" => FieldKind::Address,
        "country" => FieldKind::Country,
        "currency" => FieldKind::Currency,
        _ => FieldKind::Text,
    }
}

/// The built-in 24-field order schema.
pub fn builtin_schema() -> CanonicalSchema {
    let entries = BUILTIN_FIELDS
        .iter()
        .map(|(name, description)| (*name, *description, kind_for_field(name)));
    // Built-in names are unique and well formed.
    CanonicalSchema::new(entries).unwrap_or_default()
}

/// Load a schema from a CSV reference table.
pub fn load_schema(path: &Path) -> Result<CanonicalSchema, StandardsError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| match e.into_kind() {
            csv::ErrorKind::Io(source) => StandardsError::io(path, source),
            other => StandardsError::Csv {
                path: path.to_path_buf(),
                message: format!("{other:?}"),
            },
        })?;

    let headers: BTreeMap<String, usize> = reader
        .headers()
        .map_err(|e| StandardsError::csv(path, &e))?
        .iter()
        .enumerate()
        .map(|(idx, h)| (h.trim_matches('\u{feff}').trim().to_lowercase(), idx))
        .collect();
    let name_idx = *headers
        .get("canonical_name")
        .ok_or_else(|| StandardsError::MissingColumn {
            path: path.to_path_buf(),
            column: "canonical_name".to_string(),
        })?;
    let description_idx = headers.get("description").copied();
    let kind_idx = headers.get("kind").copied();

    let mut entries = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| StandardsError::csv(path, &e))?;
        let name = record.get(name_idx).unwrap_or("").to_string();
        if name.is_empty() {
            continue;
        }
        let description = description_idx
            .and_then(|idx| record.get(idx))
            .unwrap_or("")
            .to_string();
        let kind = match kind_idx.and_then(|idx| record.get(idx)) {
            Some(raw) if !raw.is_empty() => {
                raw.parse::<FieldKind>().map_err(|source| StandardsError::Model {
                    path: path.to_path_buf(),
                    source,
                })?
            }
            _ => kind_for_field(&name),
        };
        entries.push((name, description, kind));
    }

    if entries.is_empty() {
        return Err(StandardsError::EmptySchema {
            path: path.to_path_buf(),
        });
    }
    let schema = CanonicalSchema::new(entries).map_err(|source| StandardsError::Model {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), fields = schema.len(), "loaded canonical schema");
    Ok(schema)
}

/// Load a schema from `path`, falling back to the built-in set when the
/// table is absent or unusable.
pub fn load_schema_or_builtin(path: Option<&Path>) -> CanonicalSchema {
    let Some(path) = path else {
        return builtin_schema();
    };
    match load_schema(path) {
        Ok(schema) => schema,
        Err(error) => {
            warn!(%error, "using built-in canonical schema");
            builtin_schema()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_schema_has_every_field_in_order() {
        let schema = builtin_schema();
        assert_eq!(schema.len(), 24);
        assert_eq!(schema.fields()[0].name, "order_id");
        assert_eq!(schema.fields()[23].name, "tax_id");
        assert_eq!(schema.kind_of("total_amount"), Some(FieldKind::Amount));
        assert_eq!(schema.kind_of("tax_id"), Some(FieldKind::Identifier));
        assert_eq!(schema.kind_of("city"), Some(FieldKind::Text));
    }

    #[test]
    fn missing_file_falls_back() {
        let schema = load_schema_or_builtin(Some(Path::new("/nonexistent/schema.csv")));
        assert_eq!(schema, builtin_schema());
    }
}
