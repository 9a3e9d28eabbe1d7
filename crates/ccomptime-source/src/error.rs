use miette::{Diagnostic, SourceSpan};
use thiserror::Error;

use crate::BufferId;

/// Errors raised while reading or rewriting source buffers.
///
/// All of these indicate a broken invariant inside the pipeline rather than
/// a problem with the user's program.
#[derive(Debug, Clone, Error, Diagnostic, PartialEq, Eq)]
pub enum SourceError {
    #[error("slice belongs to buffer {slice_buffer:?} but was read against buffer {buffer:?}")]
    #[diagnostic(code(ccomptime::source::foreign_slice))]
    ForeignSlice {
        slice_buffer: BufferId,
        buffer: BufferId,
    },

    #[error("unknown buffer {0:?}")]
    #[diagnostic(code(ccomptime::source::unknown_buffer))]
    UnknownBuffer(BufferId),

    #[error("range {start}..{end} is out of bounds for a buffer of {len} bytes")]
    #[diagnostic(code(ccomptime::source::out_of_bounds))]
    OutOfBounds { start: usize, end: usize, len: usize },

    #[error("splice at offset {start} is behind the cursor at {cursor}")]
    #[diagnostic(
        code(ccomptime::source::cursor_order),
        help("replacement sites must be sorted and must not overlap")
    )]
    CursorOrder {
        cursor: usize,
        start: usize,
        #[label("this site starts before the previous one ended")]
        span: SourceSpan,
    },
}
