//! C sources shipped inside the binary.
//!
//! Both files are written next to each other into a private directory
//! before the runner is compiled, so the template's `#include "ccomptime.h"`
//! resolves with a single `-I`.

/// A runtime file and the name it must be written under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeAsset {
    pub file_name: &'static str,
    pub contents: &'static str,
}

/// The header user code includes to reach `_ComptimeCtx`.
pub const RUNTIME_HEADER: RuntimeAsset = RuntimeAsset {
    file_name: "ccomptime.h",
    contents: include_str!("../runtime/ccomptime.h"),
};

/// The runner program, compiled against the four generated artifacts.
pub const RUNNER_TEMPLATE: RuntimeAsset = RuntimeAsset {
    file_name: "runner.templ.c",
    contents: include_str!("../runtime/runner.templ.c"),
};

pub const ASSETS: [RuntimeAsset; 2] = [RUNTIME_HEADER, RUNNER_TEMPLATE];

/// Preprocessor defines the template expects, in the order they are passed.
pub const PROGRAM_PATH_DEFINE: &str = "_INPUT_PROGRAM_PATH";
pub const DEFINITIONS_PATH_DEFINE: &str = "_INPUT_COMPTIME_DEFS_PATH";
pub const REGISTRATIONS_PATH_DEFINE: &str = "_INPUT_COMPTIME_MAIN_PATH";
pub const HEADER_PATH_DEFINE: &str = "_OUTPUT_HEADERS_PATH";
