use std::io::Write;

use env_logger::Builder;
use log::LevelFilter;

/// Installs the global logger. `RUST_LOG` still refines per-module filters.
pub fn init(level: LevelFilter) {
    Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format(|buf, record| writeln!(buf, "[{:5}] {}", record.level(), record.args()))
        .init();
}
