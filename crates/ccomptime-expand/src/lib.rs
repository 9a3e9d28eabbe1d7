//! Expansion of comptime-relevant C macros.
//!
//! Only macros whose replacement text mentions `_Comptime` or
//! `_ComptimeType` (directly or through another such macro) are tracked;
//! everything else is left for the real preprocessor. Expansion works on
//! parsed trees: parameter occurrences are found in the parsed body, the
//! arguments are spliced in, and the result is parsed again so nested
//! invocations expand too.
//!
//! Every parameter must occur exactly once in a comptime macro body.
//! Bodies that use a parameter zero or several times fail with
//! [`ExpandError::ReplacementCountMismatch`] instead of expanding.

mod error;
mod expander;
mod table;

pub use error::ExpandError;
pub use expander::{Expansion, MacroExpander, DEFAULT_MAX_DEPTH};
pub use table::{MacroDefinition, MacroShape, MacroTable};
