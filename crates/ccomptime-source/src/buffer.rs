use std::fmt;
use std::ops::Range;
use std::sync::Arc;

use miette::NamedSource;

use crate::{Slice, SourceError};

/// Handle to one buffer inside a [`SourceMap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(u32);

impl BufferId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// The pipeline stage that produced a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// The file as read from disk.
    Raw,
    /// The replacement text of a `#define`, parsed on its own.
    MacroBody,
    /// The text of one macro call after argument substitution.
    MacroExpansion,
    /// The whole file after every comptime-relevant macro was expanded.
    MacroExpanded,
    /// The expanded file with `_ComptimeType(...)` replaced by placeholders.
    Corrected,
    /// The corrected file with comptime-dependent units erased.
    ComptimeSafe,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Raw => "raw",
            Stage::MacroBody => "macro body",
            Stage::MacroExpansion => "macro expansion",
            Stage::MacroExpanded => "macro-expanded",
            Stage::Corrected => "corrected",
            Stage::ComptimeSafe => "comptime-safe",
        };
        f.write_str(name)
    }
}

/// An immutable text buffer produced by one pipeline stage.
///
/// The text is reference counted so that a syntax tree parsed from the
/// buffer can keep reading it without borrowing the whole [`SourceMap`].
#[derive(Debug, Clone)]
pub struct SourceBuffer {
    id: BufferId,
    stage: Stage,
    name: String,
    text: Arc<str>,
}

impl SourceBuffer {
    pub fn id(&self) -> BufferId {
        self.id
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Shared handle to the text, used by syntax trees.
    pub fn shared_text(&self) -> Arc<str> {
        Arc::clone(&self.text)
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Creates a slice of this buffer, checking the range against its length.
    pub fn slice(&self, range: Range<usize>) -> Result<Slice, SourceError> {
        if range.start > range.end || range.end > self.text.len() {
            return Err(SourceError::OutOfBounds {
                start: range.start,
                end: range.end,
                len: self.text.len(),
            });
        }
        Ok(Slice::new(self.id, range))
    }

    /// Reads a slice, refusing slices that were taken from another buffer.
    pub fn text_of(&self, slice: Slice) -> Result<&str, SourceError> {
        if slice.buffer() != self.id {
            return Err(SourceError::ForeignSlice {
                slice_buffer: slice.buffer(),
                buffer: self.id,
            });
        }
        self.text
            .get(slice.range())
            .ok_or(SourceError::OutOfBounds {
                start: slice.start(),
                end: slice.end(),
                len: self.text.len(),
            })
    }

    /// A copy of the buffer suitable for attaching to a diagnostic.
    pub fn named_source(&self) -> NamedSource<String> {
        NamedSource::new(format!("{} ({})", self.name, self.stage), self.text.to_string())
    }
}

/// Arena of every buffer created during one pipeline run.
#[derive(Debug, Default)]
pub struct SourceMap {
    buffers: Vec<SourceBuffer>,
}

impl SourceMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, stage: Stage, name: impl Into<String>, text: impl Into<Arc<str>>) -> BufferId {
        let id = BufferId(self.buffers.len() as u32);
        let name = name.into();
        let text = text.into();
        log::trace!("buffer {:?}: {} ({}, {} bytes)", id, name, stage, text.len());
        self.buffers.push(SourceBuffer { id, stage, name, text });
        id
    }

    pub fn get(&self, id: BufferId) -> Result<&SourceBuffer, SourceError> {
        self.buffers.get(id.index()).ok_or(SourceError::UnknownBuffer(id))
    }

    /// Reads a slice against the buffer it was taken from.
    pub fn resolve(&self, slice: Slice) -> Result<&str, SourceError> {
        self.get(slice.buffer())?.text_of(slice)
    }

    /// The most recent buffer produced by `stage`, if any.
    pub fn latest(&self, stage: Stage) -> Option<&SourceBuffer> {
        self.buffers.iter().rev().find(|buffer| buffer.stage == stage)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SourceBuffer> {
        self.buffers.iter()
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }
}
