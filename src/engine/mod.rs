//! Engine: command-line surface, actions, and path helpers.

pub mod action;
pub mod arg_parser;
pub mod cli;
pub mod tools;

pub use action::{CommandAction, DescribeAction, expand_placeholders};
pub use arg_parser::Cli;
pub use cli::{config_from_toml, handle_run, merge_cli, resolve_inputs};
pub use tools::is_hidden;
