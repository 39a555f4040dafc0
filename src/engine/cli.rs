//! CLI command handler: merge the config file under the flags, then run the batch.

use colored::Colorize;
use log::{debug, warn};
use std::io;
use std::path::{Path, PathBuf};

use crate::engine::action::{CommandAction, DescribeAction};
use crate::engine::arg_parser::Cli;
use crate::engine::tools::resolve_executable;
use crate::error::{RunError, RunResult};
use crate::pipeline::run_batch;
use crate::utils::{
    PackagePaths, RunToml, load_default_toml, load_run_toml, save_run_toml, set_verbosity,
    setup_logging,
};
use crate::{NextStage, Placement, RunConfig, TargetMode};

macro_rules! apply_cli_opt {
    ($settings:expr, $cli:expr, flag $field:ident) => {
        if $cli.$field {
            $settings.$field = Some(true);
        }
    };
    ($settings:expr, $cli:expr, $field:ident) => {
        if let Some(v) = $cli.$field.clone() {
            $settings.$field = Some(v);
        }
    };
}

/// Read `--config`, or the default config file in the working directory when present.
fn load_file_config(cli: &Cli) -> RunResult<RunToml> {
    match &cli.config {
        Some(path) => load_run_toml(path),
        None => Ok(load_default_toml(
            Path::new("."),
            PackagePaths::get().config_filename(),
        )
        .unwrap_or_default()),
    }
}

/// Overlay command-line values on the file settings. Flags given on the command line win.
pub fn merge_cli(cli: &Cli, file: &mut RunToml) {
    let s = &mut file.settings;
    if cli.target.is_some() {
        s.no_target = None;
    }
    if cli.no_target {
        s.target = None;
    }
    apply_cli_opt!(s, cli, target);
    apply_cli_opt!(s, cli, flag no_target);
    apply_cli_opt!(s, cli, source);
    apply_cli_opt!(s, cli, flag keep_parent_name);
    apply_cli_opt!(s, cli, flag recursive);
    apply_cli_opt!(s, cli, max_depth);
    apply_cli_opt!(s, cli, flag follow_links);
    apply_cli_opt!(s, cli, num_cpus);
    apply_cli_opt!(s, cli, next);
    apply_cli_opt!(s, cli, exec);
    if !cli.extensions.is_empty() {
        s.extensions = Some(cli.extensions.clone());
    }
    if !cli.next_args.is_empty() {
        s.next_args = Some(cli.next_args.clone());
    }
    if let Some(v) = cli.verbosity() {
        s.verbosity = Some(v);
    }
}

/// Build the run configuration from merged settings.
pub fn config_from_toml(file: &RunToml, cli: &Cli, program_name: &str) -> RunResult<RunConfig> {
    let s = &file.settings;
    let target = match (&s.target, s.no_target.unwrap_or(false)) {
        (Some(_), true) => {
            return Err(RunError::usage("--target and --no-target are mutually exclusive"));
        }
        (_, true) => TargetMode::NoTarget,
        (Some(dir), false) => TargetMode::Dir(dir.clone()),
        (None, false) => TargetMode::Auto,
    };
    let next_stage = s.next.as_ref().map(|program| NextStage {
        program: program.clone(),
        args: s.next_args.clone().unwrap_or_default(),
    });
    let placement = if cli.prepend_discovered {
        Placement::Prepend
    } else {
        Placement::Append
    };

    let mut builder = RunConfig::builder()
        .program_name(program_name)
        .target(target)
        .keep_parent_name(s.keep_parent_name.unwrap_or(false))
        .recursive(s.recursive.unwrap_or(false) || cli.find)
        .max_depth(s.max_depth)
        .follow_links(s.follow_links.unwrap_or(false))
        .discovered_placement(placement)
        .dry_run(cli.dry_run)
        .verbosity(s.verbosity.unwrap_or_default())
        .next_stage(next_stage);
    if let Some(source) = &s.source {
        builder = builder.source_dir(source);
    }
    if let Some(exts) = &s.extensions {
        builder = builder.allowed_extensions(exts.iter().cloned());
    }
    if let Some(n) = s.num_cpus {
        builder = builder.num_workers(n);
    }
    for (key, value) in &file.extra {
        builder = builder.extra_field(key.clone(), value.clone());
    }
    builder.build()
}

/// Inputs for the run. `--find` with no files rediscovers from the source root.
pub fn resolve_inputs(cli: &Cli, source: Option<&Path>) -> Vec<String> {
    if cli.find && cli.files.is_empty() {
        let root = source.map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from("."));
        return vec![root.display().to_string()];
    }
    cli.files.clone()
}

fn program_name() -> String {
    std::env::args()
        .next()
        .as_deref()
        .map(Path::new)
        .and_then(Path::file_name)
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .unwrap_or_else(|| PackagePaths::get().pkg_name().to_string())
}

fn run(cli: &Cli, program: &str) -> RunResult<i32> {
    // Flags first so warnings from reading the config file are shown.
    setup_logging(cli.verbosity().unwrap_or_default());
    let mut file = load_file_config(cli)?;
    merge_cli(cli, &mut file);
    set_verbosity(file.settings.verbosity.unwrap_or_default());

    let config = config_from_toml(&file, cli, program)?;
    debug!("{} CONFIG:{:#?}", program.to_uppercase(), config);

    let command = file
        .settings
        .exec
        .as_deref()
        .map(CommandAction::parse)
        .transpose()?;
    if let Some(stage) = config.next_stage() {
        resolve_executable(&stage.program)?;
    }

    if let Some(path) = &cli.save_config {
        if config.dry_run() {
            warn!("Dry run: not writing config to {}", path.display());
        } else {
            save_run_toml(path, &RunToml::from_config(&config, file.settings.exec.as_deref()))?;
            debug!("Saved config to {}", path.display());
        }
    }

    let inputs = resolve_inputs(cli, config.source_dir());
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let summary = match &command {
        Some(action) => run_batch(&inputs, &config, action, &mut out)?,
        None => run_batch(&inputs, &config, &DescribeAction, &mut out)?,
    };
    Ok(summary.exit_code())
}

/// Run the batch described by `cli`. Returns the process exit code.
pub fn handle_run(cli: &Cli) -> i32 {
    let program = program_name();
    match run(cli, &program) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{}: {}", program.cyan(), err);
            let mut source = std::error::Error::source(&err);
            while let Some(cause) = source {
                eprintln!("  caused by: {}", cause);
                source = std::error::Error::source(cause);
            }
            if err.is_usage() {
                eprintln!("for help use --help");
            }
            err.exit_code()
        }
    }
}
