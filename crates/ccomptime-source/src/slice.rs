use std::ops::Range;

use miette::SourceSpan;

use crate::BufferId;

/// A byte range inside exactly one buffer.
///
/// Slices carry the id of the buffer they were taken from, so reading one
/// against any other buffer is detected instead of returning wrong text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Slice {
    buffer: BufferId,
    start: usize,
    len: usize,
}

impl Slice {
    pub fn new(buffer: BufferId, range: Range<usize>) -> Self {
        Self {
            buffer,
            start: range.start,
            len: range.end.saturating_sub(range.start),
        }
    }

    pub fn buffer(&self) -> BufferId {
        self.buffer
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn end(&self) -> usize {
        self.start + self.len
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end()
    }

    /// Whether `other` lies entirely inside this slice.
    pub fn contains(&self, other: &Slice) -> bool {
        self.buffer == other.buffer && self.start <= other.start && other.end() <= self.end()
    }

    pub fn span(&self) -> SourceSpan {
        SourceSpan::new(self.start.into(), self.len)
    }
}

impl From<Slice> for SourceSpan {
    fn from(slice: Slice) -> Self {
        slice.span()
    }
}
