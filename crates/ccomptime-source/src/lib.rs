//! Source buffer management for the ccomptime pipeline.
//!
//! Every stage of the pipeline produces a new immutable buffer:
//! raw → macro-expanded → corrected → comptime-safe. Buffers live in a
//! [`SourceMap`] arena for the duration of one run and are addressed by
//! [`BufferId`]. Text references are [`Slice`]s, which remember the buffer
//! they belong to and refuse to be read against any other.
//!
//! Rewriting is always done by [`Splicer`], which copies text between
//! sorted replacement sites, and [`scan`] provides the literal- and
//! comment-aware bracket matching used where the syntax tree is unreliable.

mod buffer;
mod error;
pub mod scan;
mod slice;
mod splice;

pub use buffer::{BufferId, SourceBuffer, SourceMap, Stage};
pub use error::SourceError;
pub use slice::Slice;
pub use splice::Splicer;
