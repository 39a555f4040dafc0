pub mod config;
pub mod logger;
pub mod run_toml;
pub mod target;

pub use config::*;
pub use logger::{level_for, set_verbosity, setup_logging};
pub use run_toml::{RunToml, SettingsSection, load_default_toml, load_run_toml, save_run_toml};
pub use target::construct_target;
