//! Utility functions for mapping operations.

/// Normalizes text for comparison by lowercasing and replacing separators with spaces.
pub fn normalize_text(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .replace(['_', '-', '.', '/', '\\'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Tokens of a canonical field identifier (`total_amount` -> `total`, `amount`).
pub fn field_tokens(field: &str) -> impl Iterator<Item = String> + '_ {
    field
        .split(['_', '-', ' ', '.'])
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
}

/// Case-insensitive comparison ignoring surrounding whitespace.
pub fn same_header(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_replaces_separators() {
        assert_eq!(normalize_text("  Grand_Total/Amt "), "grand total amt");
    }

    #[test]
    fn tokens_split_on_separators() {
        let tokens: Vec<String> = field_tokens("shipping_fee").collect();
        assert_eq!(tokens, ["shipping", "fee"]);
    }

    #[test]
    fn same_header_ignores_case() {
        assert!(same_header(" Order No", "order no"));
        assert!(!same_header("Order No", "order_no"));
    }
}
