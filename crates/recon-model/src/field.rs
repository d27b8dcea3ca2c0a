//! Canonical schema types.
//!
//! The canonical schema is the fixed, ordered universe of mapping targets.
//! Each field carries a [`FieldKind`] which selects the normalize/validate
//! handler pair used during cleaning.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};

/// Class of a canonical field, selecting its normalization and validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Tax/registration identifiers: alphanumeric, uppercased.
    Identifier,
    /// Monetary amounts (currency symbols and separators stripped).
    Amount,
    /// Fractions written either as `0.18` or `18%`.
    Percentage,
    /// Unit counts.
    Quantity,
    /// Calendar dates emitted as `YYYY-MM-DD`.
    Date,
    /// Postal/ZIP/PIN codes, kept as opaque strings.
    PostalCode,
    Phone,
    Email,
    /// Billing or shipping address lines.
    Address,
    Country,
    Currency,
    /// Anything else.
    Text,
}

impl FieldKind {
    pub const ALL: [FieldKind; 12] = [
        FieldKind::Identifier,
        FieldKind::Amount,
        FieldKind::Percentage,
        FieldKind::Quantity,
        FieldKind::Date,
        FieldKind::PostalCode,
        FieldKind::Phone,
        FieldKind::Email,
        FieldKind::Address,
        FieldKind::Country,
        FieldKind::Currency,
        FieldKind::Text,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Identifier => "identifier",
            FieldKind::Amount => "amount",
            FieldKind::Percentage => "percentage",
            FieldKind::Quantity => "quantity",
            FieldKind::Date => "date",
            FieldKind::PostalCode => "postal_code",
            FieldKind::Phone => "phone",
            FieldKind::Email => "email",
            FieldKind::Address => "address",
            FieldKind::Country => "country",
            FieldKind::Currency => "currency",
            FieldKind::Text => "text",
        }
    }

    /// Kinds whose values are expected to be numbers.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            FieldKind::Amount | FieldKind::Percentage | FieldKind::Quantity
        )
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldKind {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_lowercase().replace(['-', ' '], "_");
        FieldKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| ModelError::UnknownFieldKind(s.to_string()))
    }
}

/// One entry in the canonical target schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalField {
    /// Unique key, e.g. `order_date`.
    pub name: String,
    pub description: String,
    /// Position in the output schema (0-based).
    pub position: usize,
    pub kind: FieldKind,
}

/// Ordered, immutable set of canonical fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalSchema {
    fields: Vec<CanonicalField>,
}

impl CanonicalSchema {
    /// Build a schema from `(name, description, kind)` triples in output order.
    pub fn new<I, N, D>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (N, D, FieldKind)>,
        N: Into<String>,
        D: Into<String>,
    {
        let mut fields: Vec<CanonicalField> = Vec::new();
        for (name, description, kind) in entries {
            let name: String = name.into();
            let trimmed = name.trim();
            if trimmed.is_empty() || trimmed.contains(char::is_whitespace) {
                return Err(ModelError::InvalidFieldName(name));
            }
            if fields.iter().any(|f| f.name.eq_ignore_ascii_case(trimmed)) {
                return Err(ModelError::DuplicateField(trimmed.to_string()));
            }
            fields.push(CanonicalField {
                name: trimmed.to_string(),
                description: description.into(),
                position: fields.len(),
                kind,
            });
        }
        Ok(Self { fields })
    }

    pub fn fields(&self) -> &[CanonicalField] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Case-insensitive lookup by field name.
    pub fn get(&self, name: &str) -> Option<&CanonicalField> {
        let name = name.trim();
        self.fields
            .iter()
            .find(|f| f.name.eq_ignore_ascii_case(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn kind_of(&self, name: &str) -> Option<FieldKind> {
        self.get(name).map(|f| f.kind)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// Fields of a given kind, in schema order.
    pub fn fields_of_kind(&self, kind: FieldKind) -> impl Iterator<Item = &CanonicalField> {
        self.fields.iter().filter(move |f| f.kind == kind)
    }
}
