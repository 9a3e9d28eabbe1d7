use std::path::{Path, PathBuf};

use ccomptime_driver::{resolve_config, CompilerInvocation, Session, SessionOptions};
use clap::Parser;
use clap_verbosity_flag::{InfoLevel, Verbosity};
use log::LevelFilter;

mod error;
mod logging;

use error::CliError;

#[derive(Parser, Debug)]
#[command(name = "ccomptime", version)]
#[command(about = "Runs _Comptime code at build time, then compiles with clang, gcc or tcc", long_about = None)]
struct Args {
    /// Keep generated intermediate files next to each input
    #[arg(short = 'k', long)]
    keep_intermediates: bool,

    /// Build the runner with debug info and sanitizers
    #[arg(long)]
    debug_runner: bool,

    /// Config file to use instead of the nearest ccomptime.toml
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log the text of every pipeline stage
    #[arg(long)]
    emit_stages: bool,

    #[command(flatten)]
    verbose: Verbosity<InfoLevel>,

    /// The compiler followed by its arguments
    #[arg(
        value_name = "COMPILER",
        required = true,
        num_args = 1..,
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    command: Vec<String>,
}

fn main() -> miette::Result<()> {
    let args = Args::parse();
    let invocation = CompilerInvocation::classify(&args.command).map_err(CliError::from)?;

    let level = if invocation.tool_flags().no_logs {
        LevelFilter::Error
    } else {
        args.verbose.log_level_filter()
    };
    logging::init(level);

    let options = session_options(&args, &invocation)?;
    Session::new(invocation, options)
        .and_then(Session::run)
        .map_err(CliError::from)?;
    Ok(())
}

fn session_options(args: &Args, invocation: &CompilerInvocation) -> Result<SessionOptions, CliError> {
    if let Some(path) = &args.config {
        if !path.is_file() {
            return Err(CliError::MissingConfig { path: path.clone() });
        }
    }

    let start = match invocation.inputs().next() {
        Some(input) => input.to_path_buf(),
        None => std::env::current_dir().map_err(|source| CliError::CurrentDir { source })?,
    };
    let config = resolve_config(args.config.as_deref(), &start)?;

    let mut options = SessionOptions::from_config(&config);
    options.keep_intermediates |= args.keep_intermediates;
    options.debug_runner |= args.debug_runner;
    options.emit_stages = args.emit_stages;
    options.apply_tool_flags(invocation.tool_flags());
    log::debug!("{} at {}, options {:?}", invocation.kind(), Path::new(invocation.compiler()).display(), options);
    Ok(options)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compiler_arguments_are_not_parsed_as_options() {
        let args = Args::try_parse_from(["ccomptime", "-k", "gcc", "-v", "-o", "out", "main.c", "-comptime-debug"]).unwrap();
        assert!(args.keep_intermediates);
        assert_eq!(args.command, ["gcc", "-v", "-o", "out", "main.c", "-comptime-debug"]);
    }

    #[test]
    fn test_compiler_is_required() {
        assert!(Args::try_parse_from(["ccomptime", "--debug-runner"]).is_err());
    }

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }
}
