//! Value-level normalization helpers.
//!
//! - **datetime**: lenient date parsing with day/month disambiguation
//! - **numeric**: amount and percentage parsing
//! - **text**: null tokens and whitespace cleanup

pub mod datetime;
pub mod numeric;
pub mod text;

pub use datetime::{is_iso_date, normalize_date, parse_date_value, parse_with_formats};
pub use numeric::{format_numeric, is_numeric, parse_amount, parse_f64, parse_percentage};
pub use text::{collapse_control_whitespace, collapse_whitespace, is_null_token};
