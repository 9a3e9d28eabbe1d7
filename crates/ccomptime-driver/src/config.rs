use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::io_error;
use crate::{DriverError, DriverResult};

pub const CONFIG_FILE_NAME: &str = "ccomptime.toml";

/// Settings read from `ccomptime.toml`. Command-line switches override them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ToolConfig {
    #[serde(default)]
    pub keep_intermediates: bool,
    #[serde(default)]
    pub debug_runner: bool,
    /// Extra flags for the runner compile only.
    #[serde(default)]
    pub runner_flags: Vec<String>,
    #[serde(default)]
    pub runner_timeout_secs: Option<u64>,
}

impl ToolConfig {
    pub fn runner_timeout(&self) -> Option<Duration> {
        self.runner_timeout_secs.map(Duration::from_secs)
    }
}

/// Searches `start` and its ancestors for `ccomptime.toml`.
pub fn find_config(start: &Path) -> Option<PathBuf> {
    let mut current = if start.is_dir() {
        start.to_path_buf()
    } else {
        start.parent().map_or_else(|| start.to_path_buf(), Path::to_path_buf)
    };

    loop {
        let candidate = current.join(CONFIG_FILE_NAME);
        if candidate.is_file() {
            return Some(candidate);
        }
        if !current.pop() {
            return None;
        }
    }
}

pub fn load_config(path: &Path) -> DriverResult<ToolConfig> {
    let text = std::fs::read_to_string(path).map_err(io_error(path, "reading config"))?;
    let config = toml::from_str(&text).map_err(|source| DriverError::Config {
        path: path.to_path_buf(),
        source,
    })?;
    log::debug!("loaded {}: {:?}", path.display(), config);
    Ok(config)
}

/// Loads `explicit` if given, otherwise the nearest config above `start`.
///
/// A missing file yields the defaults.
pub fn resolve_config(explicit: Option<&Path>, start: &Path) -> DriverResult<ToolConfig> {
    match explicit.map(Path::to_path_buf).or_else(|| find_config(start)) {
        Some(path) => load_config(&path),
        None => Ok(ToolConfig::default()),
    }
}
