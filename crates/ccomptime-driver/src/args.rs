use std::fmt;
use std::path::{Path, PathBuf};

use crate::{DriverError, DriverResult};

pub const FLAG_DEBUG: &str = "-comptime-debug";
pub const FLAG_KEEP_INTERMEDIATES: &str = "-comptime-keep-inter";
pub const FLAG_NO_LOGS: &str = "-comptime-no-logs";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompilerKind {
    Clang,
    Gcc,
    Tcc,
}

impl CompilerKind {
    /// Recognises `gcc`, `/usr/bin/clang`, `clang-17`, `tcc.exe` and the like.
    pub fn from_program(program: &str) -> Option<Self> {
        let stem = Path::new(program).file_stem()?.to_str()?;
        let family = stem.split_once('-').map_or(stem, |(family, _)| family);
        match family {
            "clang" => Some(CompilerKind::Clang),
            "gcc" => Some(CompilerKind::Gcc),
            "tcc" => Some(CompilerKind::Tcc),
            _ => None,
        }
    }
}

impl fmt::Display for CompilerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CompilerKind::Clang => "clang",
            CompilerKind::Gcc => "gcc",
            CompilerKind::Tcc => "tcc",
        })
    }
}

/// `-comptime-*` switches mixed into the compiler arguments.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ToolFlags {
    pub debug: bool,
    pub keep_intermediates: bool,
    pub no_logs: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Argument {
    Input(PathBuf),
    Output(String),
    Flag(String),
}

/// A compiler command line split into what ccomptime handles and what it forwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerInvocation {
    compiler: String,
    kind: CompilerKind,
    arguments: Vec<Argument>,
    tool_flags: ToolFlags,
}

impl CompilerInvocation {
    /// Classifies `args`, whose first element is the compiler.
    pub fn classify<S: AsRef<str>>(args: &[S]) -> DriverResult<Self> {
        let (compiler, rest) = args.split_first().ok_or(DriverError::NoCompiler)?;
        let compiler = compiler.as_ref().to_string();
        let kind = CompilerKind::from_program(&compiler).ok_or_else(|| DriverError::UnsupportedCompiler {
            name: compiler.clone(),
        })?;

        let mut arguments = Vec::new();
        let mut tool_flags = ToolFlags::default();
        let mut rest = rest.iter().map(AsRef::as_ref);
        while let Some(arg) = rest.next() {
            match arg {
                "-o" => {
                    let output = rest.next().ok_or(DriverError::MissingOutputPath)?;
                    arguments.push(Argument::Output(output.to_string()));
                }
                FLAG_DEBUG => tool_flags.debug = true,
                FLAG_KEEP_INTERMEDIATES => tool_flags.keep_intermediates = true,
                FLAG_NO_LOGS => tool_flags.no_logs = true,
                flag if flag.starts_with("-comptime") => {
                    return Err(DriverError::UnknownToolFlag { flag: flag.to_string() });
                }
                input if input.ends_with(".c") || input.ends_with(".C") => {
                    arguments.push(Argument::Input(PathBuf::from(input)));
                }
                flag => arguments.push(Argument::Flag(flag.to_string())),
            }
        }

        Ok(Self {
            compiler,
            kind,
            arguments,
            tool_flags,
        })
    }

    pub fn compiler(&self) -> &str {
        &self.compiler
    }

    pub fn kind(&self) -> CompilerKind {
        self.kind
    }

    pub fn tool_flags(&self) -> ToolFlags {
        self.tool_flags
    }

    pub fn inputs(&self) -> impl Iterator<Item = &Path> {
        self.arguments.iter().filter_map(|arg| match arg {
            Argument::Input(path) => Some(path.as_path()),
            _ => None,
        })
    }

    pub fn output(&self) -> Option<&str> {
        self.arguments.iter().rev().find_map(|arg| match arg {
            Argument::Output(path) => Some(path.as_str()),
            _ => None,
        })
    }

    /// Arguments that are neither inputs nor `-o`, in order.
    pub fn passthrough(&self) -> impl Iterator<Item = &str> {
        self.arguments.iter().filter_map(|arg| match arg {
            Argument::Flag(flag) => Some(flag.as_str()),
            _ => None,
        })
    }

    /// The original arguments with the n-th input replaced by `wrappers[n]`.
    ///
    /// Tool flags are dropped. The compiler itself is not included.
    pub fn final_arguments(&self, wrappers: &[PathBuf]) -> Vec<String> {
        let mut wrappers = wrappers.iter();
        let mut out = Vec::with_capacity(self.arguments.len() + 1);
        for arg in &self.arguments {
            match arg {
                Argument::Input(input) => {
                    let path = wrappers.next().unwrap_or(input);
                    out.push(path.display().to_string());
                }
                Argument::Output(output) => {
                    out.push("-o".to_string());
                    out.push(output.clone());
                }
                Argument::Flag(flag) => out.push(flag.clone()),
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_splits_arguments() {
        let invocation = CompilerInvocation::classify(&[
            "gcc",
            "-Wall",
            "main.c",
            "-comptime-keep-inter",
            "-o",
            "app",
            "util.C",
            "-lm",
        ])
        .unwrap();

        assert_eq!(invocation.kind(), CompilerKind::Gcc);
        assert_eq!(invocation.inputs().collect::<Vec<_>>(), [Path::new("main.c"), Path::new("util.C")]);
        assert_eq!(invocation.output(), Some("app"));
        assert_eq!(invocation.passthrough().collect::<Vec<_>>(), ["-Wall", "-lm"]);
        assert!(invocation.tool_flags().keep_intermediates);
        assert!(!invocation.tool_flags().debug);
    }

    #[test]
    fn test_final_arguments_swap_inputs() {
        let invocation = CompilerInvocation::classify(&["clang", "a.c", "-O2", "b.c", "-o", "out", "-comptime-debug"]).unwrap();
        let wrappers = [PathBuf::from("/tmp/a.cct-final.c"), PathBuf::from("/tmp/b.cct-final.c")];
        assert_eq!(
            invocation.final_arguments(&wrappers),
            ["/tmp/a.cct-final.c", "-O2", "/tmp/b.cct-final.c", "-o", "out"]
        );
    }

    #[test]
    fn test_compiler_names() {
        assert_eq!(CompilerKind::from_program("/usr/bin/clang-17"), Some(CompilerKind::Clang));
        assert_eq!(CompilerKind::from_program("tcc"), Some(CompilerKind::Tcc));
        assert_eq!(CompilerKind::from_program("cc"), None);
        assert_eq!(CompilerKind::from_program("gccgo"), None);
    }

    #[test]
    fn test_rejects_bad_command_lines() {
        let empty: [&str; 0] = [];
        assert!(matches!(CompilerInvocation::classify(&empty), Err(DriverError::NoCompiler)));
        assert!(matches!(
            CompilerInvocation::classify(&["msvc", "a.c"]),
            Err(DriverError::UnsupportedCompiler { .. })
        ));
        assert!(matches!(
            CompilerInvocation::classify(&["gcc", "a.c", "-comptime-fast"]),
            Err(DriverError::UnknownToolFlag { ref flag }) if flag == "-comptime-fast"
        ));
        assert!(matches!(
            CompilerInvocation::classify(&["gcc", "a.c", "-o"]),
            Err(DriverError::MissingOutputPath)
        ));
    }
}
