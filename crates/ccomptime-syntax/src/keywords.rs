//! The reserved spellings the pipeline recognises in C source.

pub const COMPTIME: &str = "_Comptime";
pub const COMPTIME_TYPE: &str = "_ComptimeType";

/// Prefix of the identifiers substituted for `_ComptimeType(...)`.
pub const PLACEHOLDER_PREFIX: &str = "_COMPTIMETYPE_";

pub fn is_comptime_keyword(text: &str) -> bool {
    text == COMPTIME || text == COMPTIME_TYPE
}

/// `_COMPTIMETYPE_<index>`.
pub fn placeholder(index: usize) -> String {
    format!("{PLACEHOLDER_PREFIX}{index}")
}

/// Parses the index out of a placeholder identifier.
pub fn placeholder_index(text: &str) -> Option<usize> {
    let digits = text.strip_prefix(PLACEHOLDER_PREFIX)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_roundtrip() {
        assert_eq!(placeholder(12), "_COMPTIMETYPE_12");
        assert_eq!(placeholder_index("_COMPTIMETYPE_12"), Some(12));
    }

    #[test]
    fn test_placeholder_rejects_other_identifiers() {
        assert_eq!(placeholder_index("_COMPTIMETYPE_"), None);
        assert_eq!(placeholder_index("_COMPTIMETYPE_x1"), None);
        assert_eq!(placeholder_index("_COMPTIME_X0"), None);
        assert!(is_comptime_keyword("_ComptimeType"));
        assert!(!is_comptime_keyword("_ComptimeCtx"));
    }
}
