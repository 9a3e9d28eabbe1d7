//! Runner generation.
//!
//! Turns an [`Analysis`](ccomptime_analysis::Analysis) into the texts the
//! runner program is compiled from, and carries the C runtime the runner
//! and user code include.

mod error;
mod generate;
pub mod runtime;

pub use error::CodegenError;
pub use generate::{comptime_safe_source, generate, header_prelude, RunnerArtifacts, COMPILING_PREFIX};
