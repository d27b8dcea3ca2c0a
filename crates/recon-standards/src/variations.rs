//! Known alternate header spellings for each canonical field.
//!
//! Variations are a scoring aid only; they never decide a mapping on their own.

use std::collections::BTreeMap;
use std::path::Path;

use tracing::debug;

use crate::error::StandardsError;

const BUILTIN_VARIATIONS: &[(&str, &[&str])] = &[
    ("order_id", &["Order No", "OrderID", "reference", "order_ref"]),
    ("order_date", &["OrderDate", "ordered_on", "order_date", "date"]),
    ("customer_id", &["Cust ID", "client_ref", "customer_id", "cust_id"]),
    ("customer_name", &["Customer", "client_name", "cust_name", "name"]),
    ("email", &["E-mail", "Email", "contact", "email_addr"]),
    ("phone", &["Phone #", "mobile", "phone_no", "contact_no"]),
    ("billing_address", &["Bill Addr", "bill_to", "billing_addr"]),
    ("shipping_address", &["Ship Addr", "ship_to", "shipping_addr"]),
    ("city", &["City"]),
    ("state", &["State/Province", "state", "province"]),
    ("postal_code", &["ZIP/Postal", "pin", "zip", "postal"]),
    ("country", &["Country/Region", "country", "region"]),
    ("product_sku", &["SKU", "stock_code", "sku_code"]),
    ("product_name", &["Item", "desc", "description", "product"]),
    ("category", &["Cat.", "category_name", "cat"]),
    ("subcategory", &["Subcat", "sub_category", "sub_cat"]),
    ("quantity", &["Qty", "QTY", "qty"]),
    ("unit_price", &["Unit Price", "price", "unit_cost"]),
    ("currency", &["Currency"]),
    ("discount_pct", &["Disc%", "discount", "disc_pct"]),
    ("tax_pct", &["Tax%", "gst", "tax_rate"]),
    ("shipping_fee", &["Ship Fee", "logistics_fee", "shipping"]),
    ("total_amount", &["Total", "grand_total", "amount"]),
    ("tax_id", &["Reg No", "GSTIN", "tax_number"]),
];

/// Ordered alternate spellings per canonical field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariationTable {
    entries: BTreeMap<String, Vec<String>>,
}

impl VariationTable {
    pub fn builtin() -> Self {
        let entries = BUILTIN_VARIATIONS
            .iter()
            .map(|(field, variations)| {
                (
                    (*field).to_string(),
                    variations.iter().map(|v| (*v).to_string()).collect(),
                )
            })
            .collect();
        Self { entries }
    }

    pub fn variations_for(&self, field: &str) -> &[String] {
        self.entries
            .get(field)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Append variations for `field`, skipping case-insensitive duplicates.
    pub fn extend_field<I, S>(&mut self, field: &str, variations: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let entry = self.entries.entry(field.to_string()).or_default();
        for variation in variations {
            let variation: String = variation.into();
            let trimmed = variation.trim();
            if trimmed.is_empty() || entry.iter().any(|v| v.eq_ignore_ascii_case(trimmed)) {
                continue;
            }
            entry.push(trimmed.to_string());
        }
    }

    /// Merge a JSON object of `field -> [variation, ...]` into this table.
    pub fn merge_json(&mut self, json: &str) -> Result<usize, serde_json::Error> {
        let overrides: BTreeMap<String, Vec<String>> = serde_json::from_str(json)?;
        let mut added = 0;
        for (field, variations) in overrides {
            let before = self.variations_for(&field).len();
            self.extend_field(&field, variations);
            added += self.variations_for(&field).len() - before;
        }
        Ok(added)
    }

    /// Builtin table extended with the overrides stored at `path`.
    pub fn load_with_overrides(path: &Path) -> Result<Self, StandardsError> {
        let text = std::fs::read_to_string(path).map_err(|e| StandardsError::io(path, e))?;
        let mut table = Self::builtin();
        let added = table
            .merge_json(&text)
            .map_err(|source| StandardsError::Json {
                path: path.to_path_buf(),
                source,
            })?;
        debug!(path = %path.display(), added, "merged header variations");
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_covers_order_id() {
        let table = VariationTable::builtin();
        assert_eq!(table.variations_for("order_id")[0], "Order No");
        assert!(table.variations_for("unknown").is_empty());
    }

    #[test]
    fn merge_skips_duplicates() {
        let mut table = VariationTable::builtin();
        let added = table
            .merge_json(r#"{"quantity": ["qty", "Units"], "coupon_code": ["promo"]}"#)
            .unwrap();
        assert_eq!(added, 2);
        assert_eq!(table.variations_for("quantity").last().map(String::as_str), Some("Units"));
        assert_eq!(table.variations_for("coupon_code"), ["promo".to_string()]);
    }
}
