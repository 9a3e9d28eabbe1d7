use std::path::PathBuf;

use ccomptime_driver::DriverError;
use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    #[error("Failed to resolve the working directory")]
    #[diagnostic(code(ccomptime::cli::current_dir))]
    CurrentDir {
        #[source]
        source: std::io::Error,
    },

    #[error("Config file `{path}` does not exist")]
    #[diagnostic(code(ccomptime::cli::missing_config))]
    MissingConfig { path: PathBuf },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Driver(#[from] DriverError),
}
