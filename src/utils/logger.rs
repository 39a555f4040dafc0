use colored::Colorize;
use env_logger::Builder;
use log::{Level, LevelFilter};
use std::io::Write;

use crate::Verbosity;

/// Log level for this crate at the given verbosity.
pub fn level_for(verbosity: Verbosity) -> LevelFilter {
    match verbosity {
        Verbosity::Debug => LevelFilter::Debug,
        Verbosity::Info => LevelFilter::Info,
        Verbosity::Quiet => LevelFilter::Warn,
        Verbosity::Silent => LevelFilter::Error,
    }
}

/// Install the logger once. The crate logs up to debug; [`set_verbosity`] caps what is emitted.
pub fn setup_logging(verbosity: Verbosity) {
    let _ = Builder::from_default_env()
        .filter_level(LevelFilter::Warn) // Default: only warnings from dependencies
        .filter_module(env!("CARGO_PKG_NAME"), LevelFilter::Debug)
        .format(|buf, record| {
            let name = env!("CARGO_PKG_NAME");
            let line = match record.level() {
                Level::Error | Level::Warn => {
                    let level_str = match record.level() {
                        Level::Warn => "WARN".yellow(),
                        _ => "ERROR".red(),
                    };
                    let path = record.target().to_string().white();
                    format!("[{} {} {}] {}", name.cyan(), level_str, path, record.args())
                }
                _ => format!("[{}] {}", name.cyan(), record.args()),
            };
            writeln!(buf, "{}", line)
        })
        .try_init();
    set_verbosity(verbosity);
}

/// Re-level an installed logger, e.g. once file settings have been merged.
pub fn set_verbosity(verbosity: Verbosity) {
    log::set_max_level(level_for(verbosity));
}
