//! Comptime analysis over a macro-expanded C file.
//!
//! [`CorrectionPass`] turns every `_ComptimeType(...)` into a placeholder
//! identifier so the grammar sees ordinary C. [`analyze`] then finds the
//! comptime statements of the corrected file, the names that depend on
//! their output, and the code that must be erased before the file can be
//! compiled into the runner.

mod correct;
mod deps;
mod error;
mod form;

pub use correct::{Correction, CorrectionPass, OccurrenceShape, Placeholder, PlaceholderTable};
pub use deps::{analyze, Analysis, Attribution, ComptimeStatement, DependencySet, RemovalList};
pub use error::AnalysisError;
