use std::path::PathBuf;

use ccomptime_analysis::AnalysisError;
use ccomptime_codegen::CodegenError;
use ccomptime_expand::ExpandError;
use ccomptime_source::SourceError;
use ccomptime_syntax::SyntaxError;
use miette::Diagnostic;
use thiserror::Error;

/// A failure while transforming one file.
#[derive(Debug, Error, Diagnostic)]
pub enum PipelineError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Syntax(#[from] SyntaxError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Expand(#[from] ExpandError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Analysis(#[from] AnalysisError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Codegen(#[from] CodegenError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Source(#[from] SourceError),
}

#[derive(Debug, Error, Diagnostic)]
pub enum DriverError {
    #[error("No compiler given")]
    #[diagnostic(
        code(ccomptime::driver::no_compiler),
        help("Invoke as `ccomptime <clang|gcc|tcc> [ARGS]...`")
    )]
    NoCompiler,

    #[error("Unsupported compiler `{name}`")]
    #[diagnostic(
        code(ccomptime::driver::unsupported_compiler),
        help("Supported compilers are clang, gcc and tcc")
    )]
    UnsupportedCompiler { name: String },

    #[error("Unknown comptime flag `{flag}`")]
    #[diagnostic(
        code(ccomptime::driver::unknown_flag),
        help("Known flags are -comptime-debug, -comptime-keep-inter and -comptime-no-logs")
    )]
    UnknownToolFlag { flag: String },

    #[error("`-o` must be followed by an output path")]
    #[diagnostic(code(ccomptime::driver::missing_output))]
    MissingOutputPath,

    #[error("Failed {operation} `{path}`")]
    #[diagnostic(code(ccomptime::driver::io_error))]
    Io {
        path: PathBuf,
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file `{path}`")]
    #[diagnostic(code(ccomptime::driver::config_error))]
    Config {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to start `{command}`")]
    #[diagnostic(code(ccomptime::driver::spawn_failed))]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` failed with {status}")]
    #[diagnostic(code(ccomptime::driver::command_failed))]
    CommandFailed { command: String, status: String },

    #[error("`{command}` did not finish within {seconds}s")]
    #[diagnostic(
        code(ccomptime::driver::runner_timeout),
        help("Raise `runner_timeout_secs` in ccomptime.toml if the comptime code is expected to be slow")
    )]
    Timeout { command: String, seconds: u64 },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Pipeline(#[from] PipelineError),
}

pub type DriverResult<T> = Result<T, DriverError>;

pub(crate) fn io_error(path: impl Into<PathBuf>, operation: &str) -> impl FnOnce(std::io::Error) -> DriverError {
    let path = path.into();
    let operation = operation.to_string();
    move |source| DriverError::Io {
        path,
        operation,
        source,
    }
}
