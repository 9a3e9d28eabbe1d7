use std::ops::Range;

use ccomptime_source::scan::{matching_close, skip_blanks, trim_range};

/// A keyword followed by its parenthesised code, located in raw text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Form {
    /// From the keyword through the closing parenthesis.
    pub occurrence: Range<usize>,
    /// The code inside the parentheses, trimmed.
    pub body: Range<usize>,
}

/// Finds the parenthesised body following a keyword that ends at `keyword.end`.
///
/// Returns `None` when no `(` follows or it is never closed.
pub(crate) fn form_after(source: &str, keyword: Range<usize>) -> Option<Form> {
    let open = skip_blanks(source, keyword.end);
    if source.as_bytes().get(open) != Some(&b'(') {
        return None;
    }
    let close = matching_close(source, open)?;
    Some(Form {
        occurrence: keyword.start..close + 1,
        body: comptime_body(source, open, close),
    })
}

/// Trims the code between `open` and `close`.
///
/// Whitespace is trimmed, one enclosing `{ ... }` pair is removed, and
/// trailing semicolons are dropped.
pub(crate) fn comptime_body(source: &str, open: usize, close: usize) -> Range<usize> {
    let bytes = source.as_bytes();
    let mut body = trim_range(source, open + 1..close);

    if body.len() >= 2 && bytes[body.start] == b'{' && matching_close(source, body.start) == Some(body.end - 1) {
        body = trim_range(source, body.start + 1..body.end - 1);
    }
    while body.end > body.start && bytes[body.end - 1] == b';' {
        body = trim_range(source, body.start..body.end - 1);
    }
    body
}
