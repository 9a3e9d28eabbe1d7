//! Bracket matching over raw C text.
//!
//! Used where the syntax tree cannot be trusted: recovering
//! `_ComptimeType(...)` spans the grammar gave up on, and splitting macro
//! call arguments. Brackets inside string literals, character literals and
//! comments never count.

use std::ops::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Normal,
    InString,
    InChar,
    InLineComment,
    InBlockComment,
}

/// Iterator over the bytes of `text` that are code, starting at an offset.
///
/// Yields `(offset, byte)` pairs and skips everything inside literals and
/// comments, including their delimiters.
#[derive(Debug, Clone)]
pub struct CodeBytes<'a> {
    bytes: &'a [u8],
    pos: usize,
    state: ScanState,
}

impl<'a> CodeBytes<'a> {
    pub fn new(text: &'a str, from: usize) -> Self {
        Self {
            bytes: text.as_bytes(),
            pos: from,
            state: ScanState::Normal,
        }
    }

    fn peek(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }
}

impl Iterator for CodeBytes<'_> {
    type Item = (usize, u8);

    fn next(&mut self) -> Option<Self::Item> {
        while self.pos < self.bytes.len() {
            let byte = self.bytes[self.pos];
            match self.state {
                ScanState::InString | ScanState::InChar => {
                    let quote = if self.state == ScanState::InString { b'"' } else { b'\'' };
                    if byte == b'\\' {
                        self.pos += 2;
                        continue;
                    }
                    if byte == quote {
                        self.state = ScanState::Normal;
                    }
                    self.pos += 1;
                }
                ScanState::InLineComment => {
                    if byte == b'\n' {
                        self.state = ScanState::Normal;
                    }
                    self.pos += 1;
                }
                ScanState::InBlockComment => {
                    if byte == b'*' && self.peek(1) == Some(b'/') {
                        self.state = ScanState::Normal;
                        self.pos += 2;
                    } else {
                        self.pos += 1;
                    }
                }
                ScanState::Normal => {
                    match (byte, self.peek(1)) {
                        (b'/', Some(b'/')) => {
                            self.state = ScanState::InLineComment;
                            self.pos += 2;
                        }
                        (b'/', Some(b'*')) => {
                            self.state = ScanState::InBlockComment;
                            self.pos += 2;
                        }
                        (b'"', _) => {
                            self.state = ScanState::InString;
                            self.pos += 1;
                        }
                        (b'\'', _) => {
                            self.state = ScanState::InChar;
                            self.pos += 1;
                        }
                        _ => {
                            self.pos += 1;
                            return Some((self.pos - 1, byte));
                        }
                    }
                }
            }
        }
        None
    }
}

fn closing_for(open: u8) -> Option<u8> {
    match open {
        b'(' => Some(b')'),
        b'[' => Some(b']'),
        b'{' => Some(b'}'),
        _ => None,
    }
}

/// Offset of the bracket closing the one at `open`.
///
/// Returns `None` when `open` is not `(`, `[` or `{`, or when the text ends
/// before the bracket is balanced.
pub fn matching_close(text: &str, open: usize) -> Option<usize> {
    let open_byte = *text.as_bytes().get(open)?;
    let close_byte = closing_for(open_byte)?;
    let mut depth = 0usize;
    for (offset, byte) in CodeBytes::new(text, open) {
        if byte == open_byte {
            depth += 1;
        } else if byte == close_byte {
            depth -= 1;
            if depth == 0 {
                return Some(offset);
            }
        }
    }
    None
}

/// First offset at or after `from` that is not ASCII whitespace.
pub fn skip_blanks(text: &str, from: usize) -> usize {
    text.as_bytes()
        .iter()
        .skip(from)
        .position(|b| !b.is_ascii_whitespace())
        .map_or(text.len(), |n| from + n)
}

/// Shrinks `range` so it starts and ends on non-whitespace.
pub fn trim_range(text: &str, range: Range<usize>) -> Range<usize> {
    let bytes = text.as_bytes();
    let mut start = range.start;
    let mut end = range.end;
    while start < end && bytes[start].is_ascii_whitespace() {
        start += 1;
    }
    while end > start && bytes[end - 1].is_ascii_whitespace() {
        end -= 1;
    }
    start..end
}

/// Splits the text between a call's parentheses at top-level commas.
///
/// Ranges are relative to `inner` and trimmed. A blank argument list has
/// no arguments at all.
pub fn split_arguments(inner: &str) -> Vec<Range<usize>> {
    if inner.trim().is_empty() {
        return Vec::new();
    }

    let mut arguments = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (offset, byte) in CodeBytes::new(inner, 0) {
        match byte {
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => depth = depth.saturating_sub(1),
            b',' if depth == 0 => {
                arguments.push(trim_range(inner, start..offset));
                start = offset + 1;
            }
            _ => {}
        }
    }
    arguments.push(trim_range(inner, start..inner.len()));
    arguments
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matching_close_skips_literals_and_comments() {
        let text = r#"f(a, ")", ')', /* ) */ g(b) // )
)"#;
        let close = matching_close(text, 1).unwrap();
        assert_eq!(close, text.len() - 1);
    }

    #[test]
    fn test_matching_close_handles_escaped_quotes() {
        let text = r#"("a \" ) b") tail"#;
        assert_eq!(matching_close(text, 0), Some(11));
    }

    #[test]
    fn test_matching_close_braces() {
        let text = "{ if (x) { y(); } } rest";
        assert_eq!(matching_close(text, 0), Some(18));
        assert_eq!(matching_close(text, 9), Some(16));
    }

    #[test]
    fn test_unbalanced_or_non_bracket() {
        assert_eq!(matching_close("(a, (b)", 0), None);
        assert_eq!(matching_close("abc", 0), None);
        assert_eq!(matching_close("abc", 10), None);
    }

    #[test]
    fn test_split_arguments_respects_nesting() {
        let inner = r#"int, f(1, 2), "x,y", { a, b }"#;
        let args: Vec<&str> = split_arguments(inner)
            .into_iter()
            .map(|range| &inner[range])
            .collect();
        assert_eq!(args, vec!["int", "f(1, 2)", r#""x,y""#, "{ a, b }"]);
    }

    #[test]
    fn test_split_arguments_blank_is_empty() {
        assert!(split_arguments("  \n ").is_empty());
        assert_eq!(split_arguments(" x ").len(), 1);
    }

    #[test]
    fn test_skip_blanks_and_trim() {
        assert_eq!(skip_blanks("ab  \n(c", 2), 5);
        assert_eq!(skip_blanks("ab   ", 2), 5);
        let text = "  body ; ";
        assert_eq!(&text[trim_range(text, 0..text.len())], "body ;");
    }
}
