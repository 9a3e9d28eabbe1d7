use std::ops::Range;

use miette::SourceSpan;

use crate::SourceError;

/// Renders a new text from a source by replacing a sorted series of ranges.
///
/// Text between replacement sites is copied verbatim and the cursor only
/// ever moves forward. Whatever follows the last site is flushed by
/// [`Splicer::finish`].
#[derive(Debug)]
pub struct Splicer<'src> {
    source: &'src str,
    cursor: usize,
    out: String,
}

impl<'src> Splicer<'src> {
    pub fn new(source: &'src str) -> Self {
        Self {
            source,
            cursor: 0,
            out: String::with_capacity(source.len()),
        }
    }

    /// Starts the output with `prefix` before any source text.
    pub fn with_prefix(source: &'src str, prefix: &str) -> Self {
        let mut splicer = Self::new(source);
        splicer.out.push_str(prefix);
        splicer
    }

    /// Copies the source up to `range.start`, emits `with` and skips the range.
    pub fn replace(&mut self, range: Range<usize>, with: &str) -> Result<(), SourceError> {
        if range.start > range.end || range.end > self.source.len() {
            return Err(SourceError::OutOfBounds {
                start: range.start,
                end: range.end,
                len: self.source.len(),
            });
        }
        if range.start < self.cursor {
            return Err(SourceError::CursorOrder {
                cursor: self.cursor,
                start: range.start,
                span: SourceSpan::new(range.start.into(), range.end - range.start),
            });
        }

        self.out.push_str(&self.source[self.cursor..range.start]);
        self.out.push_str(with);
        self.cursor = range.end;
        Ok(())
    }

    pub fn erase(&mut self, range: Range<usize>) -> Result<(), SourceError> {
        self.replace(range, "")
    }

    pub fn finish(mut self) -> String {
        self.out.push_str(&self.source[self.cursor..]);
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replacements_are_spliced_in_order() {
        let mut splicer = Splicer::new("a + b * c");
        splicer.replace(0..1, "x").unwrap();
        splicer.replace(4..5, "(y)").unwrap();
        splicer.erase(5..9).unwrap();
        assert_eq!(splicer.finish(), "x + (y)");
    }

    #[test]
    fn test_prefix_and_remainder() {
        let mut splicer = Splicer::with_prefix("int a; int b;", "// head\n");
        splicer.erase(0..7).unwrap();
        assert_eq!(splicer.finish(), "// head\nint b;");
    }

    #[test]
    fn test_site_behind_cursor_is_rejected() {
        let mut splicer = Splicer::new("abcdef");
        splicer.replace(2..4, "").unwrap();
        let err = splicer.replace(3..5, "").unwrap_err();
        assert!(matches!(err, SourceError::CursorOrder { cursor: 4, start: 3, .. }));
    }

    #[test]
    fn test_out_of_bounds_site_is_rejected() {
        let mut splicer = Splicer::new("abc");
        assert!(matches!(
            splicer.replace(1..10, "z"),
            Err(SourceError::OutOfBounds { len: 3, .. })
        ));
    }
}
