use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::error::io_error;
use crate::DriverResult;

#[cfg(windows)]
const RUNNER_SUFFIX: &str = "ct-runner.exe";
#[cfg(not(windows))]
const RUNNER_SUFFIX: &str = "ct-runner";

/// Where the files generated for one input live, all next to the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub input: PathBuf,
    pub definitions: PathBuf,
    pub registrations: PathBuf,
    pub comptime_safe: PathBuf,
    pub runner: PathBuf,
    pub final_wrapper: PathBuf,
    pub header: PathBuf,
}

impl ArtifactPaths {
    /// Derives the artifact paths for `input`, made absolute against the
    /// current directory.
    pub fn for_input(input: &Path) -> DriverResult<Self> {
        let input = if input.is_absolute() {
            input.to_path_buf()
        } else {
            std::env::current_dir()
                .map_err(io_error(input, "resolving the current directory for"))?
                .join(input)
        };
        Ok(Self::from_absolute(input))
    }

    fn from_absolute(input: PathBuf) -> Self {
        Self {
            definitions: suffixed(&input, "c-runner-defs.c"),
            registrations: suffixed(&input, "c-runner-main.c"),
            comptime_safe: suffixed(&input, "omptime_safe.c"),
            runner: suffixed(&input, RUNNER_SUFFIX),
            final_wrapper: suffixed(&input, "ct-final.c"),
            header: suffixed(&input, ".h"),
            input,
        }
    }

    /// Files removed after the build unless intermediates are kept.
    ///
    /// The header is not among them: user sources include it.
    pub fn intermediates(&self) -> [&Path; 5] {
        [
            &self.definitions,
            &self.registrations,
            &self.comptime_safe,
            &self.runner,
            &self.final_wrapper,
        ]
    }
}

fn suffixed(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_are_suffixes_of_the_input() {
        let paths = ArtifactPaths::from_absolute(PathBuf::from("/src/demo.c"));
        assert_eq!(paths.definitions, Path::new("/src/demo.cc-runner-defs.c"));
        assert_eq!(paths.registrations, Path::new("/src/demo.cc-runner-main.c"));
        assert_eq!(paths.comptime_safe, Path::new("/src/demo.comptime_safe.c"));
        assert_eq!(paths.final_wrapper, Path::new("/src/demo.cct-final.c"));
        assert_eq!(paths.header, Path::new("/src/demo.c.h"));
        assert!(paths.runner.to_string_lossy().starts_with("/src/demo.cct-runner"));
        assert!(!paths.intermediates().contains(&paths.header.as_path()));
    }

    #[test]
    fn test_relative_input_is_made_absolute() {
        let paths = ArtifactPaths::for_input(Path::new("dir/file.c")).unwrap();
        assert!(paths.input.is_absolute());
        assert!(paths.input.ends_with("dir/file.c"));
        assert!(paths.header.is_absolute());
    }
}
