use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};
use std::thread;
use std::time::{Duration, Instant};

use ccomptime_codegen::runtime::{
    ASSETS, DEFINITIONS_PATH_DEFINE, HEADER_PATH_DEFINE, PROGRAM_PATH_DEFINE, REGISTRATIONS_PATH_DEFINE,
    RUNNER_TEMPLATE,
};
use ccomptime_syntax::CParser;
use tempfile::TempDir;

use crate::error::io_error;
use crate::{ArtifactPaths, CompilerInvocation, DriverError, DriverResult, Pipeline, ToolConfig, ToolFlags};

const DEBUG_RUNNER_FLAGS: [&str; 3] = ["-g", "-fsanitize=address,undefined", "-fno-omit-frame-pointer"];
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// How a build session behaves, from config and command line combined.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionOptions {
    pub keep_intermediates: bool,
    pub debug_runner: bool,
    pub emit_stages: bool,
    pub runner_flags: Vec<String>,
    pub runner_timeout: Option<Duration>,
}

impl SessionOptions {
    pub fn from_config(config: &ToolConfig) -> Self {
        Self {
            keep_intermediates: config.keep_intermediates,
            debug_runner: config.debug_runner,
            emit_stages: false,
            runner_flags: config.runner_flags.clone(),
            runner_timeout: config.runner_timeout(),
        }
    }

    /// `-comptime-*` flags can only switch options on.
    pub fn apply_tool_flags(&mut self, flags: ToolFlags) {
        self.keep_intermediates |= flags.keep_intermediates;
        self.debug_runner |= flags.debug;
    }
}

/// One `ccomptime <compiler> ...` build.
pub struct Session {
    invocation: CompilerInvocation,
    options: SessionOptions,
    parser: CParser,
    runtime: TempDir,
}

impl Session {
    /// Prepares a session, writing the C runtime into a private directory.
    pub fn new(invocation: CompilerInvocation, options: SessionOptions) -> DriverResult<Self> {
        let parser = CParser::new().map_err(crate::PipelineError::from)?;
        let runtime = tempfile::Builder::new()
            .prefix("ccomptime-runtime")
            .tempdir()
            .map_err(io_error(std::env::temp_dir(), "creating runtime directory in"))?;
        for asset in ASSETS {
            let path = runtime.path().join(asset.file_name);
            fs::write(&path, asset.contents).map_err(io_error(&path, "writing"))?;
        }
        log::debug!("runtime written to {}", runtime.path().display());

        Ok(Self {
            invocation,
            options,
            parser,
            runtime,
        })
    }

    pub fn runtime_dir(&self) -> &Path {
        self.runtime.path()
    }

    /// Transforms every input, runs its runner, then performs the real compile.
    pub fn run(mut self) -> DriverResult<()> {
        let inputs: Vec<PathBuf> = self.invocation.inputs().map(Path::to_path_buf).collect();
        if inputs.is_empty() {
            log::info!("no C inputs, forwarding to {}", self.invocation.compiler());
        }

        let mut prepared = Vec::with_capacity(inputs.len());
        let mut result = Ok(());
        for input in &inputs {
            let paths = match ArtifactPaths::for_input(input) {
                Ok(paths) => paths,
                Err(err) => {
                    result = Err(err);
                    break;
                }
            };
            let step = self.prepare(&paths);
            prepared.push(paths);
            if let Err(err) = step {
                result = Err(err);
                break;
            }
        }

        if result.is_ok() {
            let wrappers: Vec<PathBuf> = prepared.iter().map(|paths| paths.final_wrapper.clone()).collect();
            let mut command = Command::new(self.invocation.compiler());
            command.args(final_compile_arguments(
                &self.invocation,
                self.runtime.path(),
                &wrappers,
            ));
            result = run_command(&mut command, None);
        }

        if !self.options.keep_intermediates {
            for paths in &prepared {
                remove_intermediates(paths);
            }
        }
        result
    }

    fn prepare(&mut self, paths: &ArtifactPaths) -> DriverResult<()> {
        let text = fs::read_to_string(&paths.input).map_err(io_error(&paths.input, "reading"))?;
        let name = paths.input.display().to_string();
        let transformation = Pipeline::new(&mut self.parser)
            .with_emit_stages(self.options.emit_stages)
            .run(&name, &text)?;
        let artifacts = transformation.artifacts();

        write(&paths.definitions, &artifacts.definitions)?;
        write(&paths.registrations, &artifacts.registrations)?;
        write(&paths.comptime_safe, &artifacts.comptime_safe)?;
        // the runner appends to a fresh header on every build
        write(&paths.header, &artifacts.header)?;

        let mut compile = Command::new(self.invocation.compiler());
        compile.args(runner_compile_arguments(
            &self.invocation,
            &self.options,
            self.runtime.path(),
            paths,
        ));
        run_command(&mut compile, None)?;
        run_command(&mut Command::new(&paths.runner), self.options.runner_timeout)?;

        write(&paths.final_wrapper, &final_wrapper(paths))?;
        Ok(())
    }
}

/// Arguments for compiling the runner template, without the compiler itself.
pub fn runner_compile_arguments(
    invocation: &CompilerInvocation,
    options: &SessionOptions,
    runtime_dir: &Path,
    paths: &ArtifactPaths,
) -> Vec<String> {
    let mut args: Vec<String> = invocation.passthrough().map(str::to_string).collect();
    args.extend(options.runner_flags.iter().cloned());
    args.push(format!("-I{}", runtime_dir.display()));
    if options.debug_runner {
        args.extend(DEBUG_RUNNER_FLAGS.iter().map(|flag| flag.to_string()));
    } else {
        args.push("-w".to_string());
    }
    args.push(runtime_dir.join(RUNNER_TEMPLATE.file_name).display().to_string());
    args.push("-o".to_string());
    args.push(paths.runner.display().to_string());
    for (define, path) in [
        (PROGRAM_PATH_DEFINE, &paths.comptime_safe),
        (DEFINITIONS_PATH_DEFINE, &paths.definitions),
        (REGISTRATIONS_PATH_DEFINE, &paths.registrations),
        (HEADER_PATH_DEFINE, &paths.header),
    ] {
        args.push(format!("-D{define}={}", c_string(path)));
    }
    args
}

/// Arguments for the real compile, with each input swapped for its wrapper.
///
/// The runtime directory goes last so a local `ccomptime.h` takes precedence,
/// as it does for the runner.
pub fn final_compile_arguments(
    invocation: &CompilerInvocation,
    runtime_dir: &Path,
    wrappers: &[PathBuf],
) -> Vec<String> {
    let mut args = invocation.final_arguments(wrappers);
    args.push(format!("-I{}", runtime_dir.display()));
    args
}

/// The file handed to the final compile in place of the input.
pub fn final_wrapper(paths: &ArtifactPaths) -> String {
    format!(
        "#include {}\n#include {}\n",
        c_string(&paths.header),
        c_string(&paths.input)
    )
}

fn c_string(path: &Path) -> String {
    let text = path.display().to_string();
    format!("\"{}\"", text.replace('\\', "\\\\").replace('"', "\\\""))
}

fn write(path: &Path, contents: &str) -> DriverResult<()> {
    log::debug!("writing {}", path.display());
    fs::write(path, contents).map_err(io_error(path, "writing"))
}

fn describe(command: &Command) -> String {
    std::iter::once(command.get_program())
        .chain(command.get_args())
        .map(|part| part.to_string_lossy())
        .collect::<Vec<_>>()
        .join(" ")
}

fn run_command(command: &mut Command, timeout: Option<Duration>) -> DriverResult<()> {
    let described = describe(command);
    log::info!("running {}", described);
    let mut child = command.spawn().map_err(|source| DriverError::Spawn {
        command: described.clone(),
        source,
    })?;

    let status = match timeout {
        None => child.wait(),
        Some(limit) => {
            let started = Instant::now();
            loop {
                match child.try_wait() {
                    Ok(Some(status)) => break Ok(status),
                    Ok(None) if started.elapsed() >= limit => {
                        let _ = child.kill();
                        let _ = child.wait();
                        return Err(DriverError::Timeout {
                            command: described,
                            seconds: limit.as_secs(),
                        });
                    }
                    Ok(None) => thread::sleep(POLL_INTERVAL),
                    Err(err) => break Err(err),
                }
            }
        }
    }
    .map_err(|source| DriverError::Spawn {
        command: described.clone(),
        source,
    })?;

    check_status(described, status)
}

fn check_status(command: String, status: ExitStatus) -> DriverResult<()> {
    if status.success() {
        return Ok(());
    }
    let status = match status.code() {
        Some(code) => format!("exit code {code}"),
        None => "a signal".to_string(),
    };
    Err(DriverError::CommandFailed { command, status })
}

fn remove_intermediates(paths: &ArtifactPaths) {
    for path in paths.intermediates() {
        match fs::remove_file(path) {
            Ok(()) => log::trace!("removed {}", path.display()),
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => log::warn!("failed to remove {}: {}", path.display(), err),
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn paths() -> ArtifactPaths {
        ArtifactPaths::for_input(Path::new("/work/demo.c")).unwrap()
    }

    #[test]
    fn test_runner_arguments_release() {
        let invocation = CompilerInvocation::classify(&["gcc", "-DMODE=1", "/work/demo.c", "-o", "demo"]).unwrap();
        let options = SessionOptions {
            runner_flags: vec!["-lm".to_string()],
            ..SessionOptions::default()
        };
        let args = runner_compile_arguments(&invocation, &options, Path::new("/rt"), &paths());

        assert_eq!(
            args,
            [
                "-DMODE=1",
                "-lm",
                "-I/rt",
                "-w",
                "/rt/runner.templ.c",
                "-o",
                "/work/demo.cct-runner",
                "-D_INPUT_PROGRAM_PATH=\"/work/demo.comptime_safe.c\"",
                "-D_INPUT_COMPTIME_DEFS_PATH=\"/work/demo.cc-runner-defs.c\"",
                "-D_INPUT_COMPTIME_MAIN_PATH=\"/work/demo.cc-runner-main.c\"",
                "-D_OUTPUT_HEADERS_PATH=\"/work/demo.c.h\"",
            ]
        );
    }

    #[test]
    fn test_runner_arguments_debug() {
        let invocation = CompilerInvocation::classify(&["clang", "/work/demo.c", "-comptime-debug"]).unwrap();
        let mut options = SessionOptions::default();
        options.apply_tool_flags(invocation.tool_flags());
        let args = runner_compile_arguments(&invocation, &options, Path::new("/rt"), &paths());

        assert_eq!(args[..4], ["-I/rt", "-g", "-fsanitize=address,undefined", "-fno-omit-frame-pointer"]);
        assert!(!args.contains(&"-w".to_string()));
    }

    #[test]
    fn test_final_compile_sees_runtime_header() {
        let invocation = CompilerInvocation::classify(&["gcc", "-Iinclude", "/work/demo.c", "-o", "demo"]).unwrap();
        let wrappers = [PathBuf::from("/work/demo.cct-final.c")];
        let args = final_compile_arguments(&invocation, Path::new("/rt"), &wrappers);
        assert_eq!(args, ["-Iinclude", "/work/demo.cct-final.c", "-o", "demo", "-I/rt"]);
    }

    #[test]
    fn test_final_wrapper_includes_header_first() {
        assert_eq!(
            final_wrapper(&paths()),
            "#include \"/work/demo.c.h\"\n#include \"/work/demo.c\"\n"
        );
    }

    #[test]
    fn test_options_merge_config_and_flags() {
        let config = ToolConfig {
            runner_timeout_secs: Some(5),
            ..ToolConfig::default()
        };
        let mut options = SessionOptions::from_config(&config);
        options.apply_tool_flags(ToolFlags {
            keep_intermediates: true,
            ..ToolFlags::default()
        });
        assert!(options.keep_intermediates);
        assert!(!options.debug_runner);
        assert_eq!(options.runner_timeout, Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_failed_status_is_reported() {
        let status = Command::new("sh").args(["-c", "exit 3"]).status().unwrap();
        let err = check_status("sh -c exit 3".to_string(), status).unwrap_err();
        assert!(matches!(err, DriverError::CommandFailed { ref status, .. } if status == "exit code 3"));
    }
}
