//! The ccomptime build driver.
//!
//! [`Pipeline`] transforms one C file into runner artifacts. [`Session`]
//! runs the pipeline for every input of a compiler command line, builds and
//! runs each runner, then hands the wrapped inputs to the real compiler.

mod args;
mod config;
mod error;
mod paths;
mod pipeline;
mod session;

pub use args::{CompilerInvocation, CompilerKind, ToolFlags, FLAG_DEBUG, FLAG_KEEP_INTERMEDIATES, FLAG_NO_LOGS};
pub use config::{find_config, load_config, resolve_config, ToolConfig, CONFIG_FILE_NAME};
pub use error::{DriverError, DriverResult, PipelineError};
pub use paths::ArtifactPaths;
pub use pipeline::{Pipeline, Transformation};
pub use session::{final_compile_arguments, final_wrapper, runner_compile_arguments, Session, SessionOptions};

/// Classifies `args` and runs a whole build with `options`.
///
/// `-comptime-*` flags found in `args` are merged into `options`.
pub fn build<S: AsRef<str>>(args: &[S], mut options: SessionOptions) -> DriverResult<()> {
    let invocation = CompilerInvocation::classify(args)?;
    options.apply_tool_flags(invocation.tool_flags());
    log::debug!("{} build with {:?}", invocation.kind(), options);
    Session::new(invocation, options)?.run()
}
