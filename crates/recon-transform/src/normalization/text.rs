//! Free-text cleanup shared by every column.

/// Literal tokens that stand for a missing value.
pub const NULL_TOKENS: &[&str] = &["nan", "NaN", "NULL", "null", "None", "N/A", "n/a", "-"];

/// Whether a raw value is a null-ish placeholder (blank, whitespace-only,
/// or one of [`NULL_TOKENS`] with optional surrounding whitespace).
pub fn is_null_token(value: &str) -> bool {
    let trimmed = value.trim();
    trimmed.is_empty() || NULL_TOKENS.contains(&trimmed)
}

/// Replace each run of newlines, carriage returns and tabs with one space.
pub fn collapse_control_whitespace(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut in_run = false;
    for c in value.chars() {
        if matches!(c, '\n' | '\r' | '\t') {
            if !in_run {
                out.push(' ');
                in_run = true;
            }
        } else {
            out.push(c);
            in_run = false;
        }
    }
    out
}

/// Trim and collapse all internal whitespace runs to single spaces.
pub fn collapse_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_tokens() {
        for token in ["", "   ", "nan", "NULL", " - ", "N/A", "None"] {
            assert!(is_null_token(token), "{token:?}");
        }
        assert!(!is_null_token("--"));
        assert!(!is_null_token("Nancy"));
    }

    #[test]
    fn control_whitespace_runs_become_one_space() {
        assert_eq!(collapse_control_whitespace("12 Main\r\nRoad\tEast"), "12 Main Road East");
        assert_eq!(collapse_control_whitespace("a  b"), "a  b");
    }

    #[test]
    fn whitespace_collapse_trims() {
        assert_eq!(collapse_whitespace("  Asha   Rao "), "Asha Rao");
    }
}
