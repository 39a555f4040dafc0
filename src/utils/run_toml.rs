//! Read and write run configuration files (`[settings]` + `[extra]` TOML tables).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{RunError, RunResult};
use crate::{ExtraValue, RunConfig, TargetMode, Verbosity};

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RunToml {
    #[serde(default)]
    pub settings: SettingsSection,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, ExtraValue>,
}

/// Keys mirror the CLI flags. Every field is optional; absent keys leave the CLI default.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SettingsSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub no_target: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keep_parent_name: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recursive: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_depth: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub follow_links: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_cpus: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verbosity: Option<Verbosity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_args: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exec: Option<String>,
}

fn config_error(path: &Path, message: impl ToString) -> RunError {
    RunError::Config {
        path: path.to_path_buf(),
        message: message.to_string(),
    }
}

/// Load an explicitly requested config file. Missing or malformed files are errors.
pub fn load_run_toml(path: &Path) -> RunResult<RunToml> {
    let s = std::fs::read_to_string(path).map_err(|e| config_error(path, e))?;
    toml::from_str(&s).map_err(|e| config_error(path, e))
}

/// Load `<dir>/<config filename>` if present. Returns None if missing or unreadable.
pub fn load_default_toml(dir: &Path, filename: &str) -> Option<RunToml> {
    let path = dir.join(filename);
    let s = std::fs::read_to_string(&path).ok()?;
    toml::from_str(&s)
        .map_err(|e| log::warn!("{}: {}", path.display(), e))
        .ok()
}

impl RunToml {
    /// Snapshot of an effective configuration, in file form.
    pub fn from_config(config: &RunConfig, exec: Option<&str>) -> Self {
        let (target, no_target) = match config.target() {
            TargetMode::NoTarget => (None, Some(true)),
            TargetMode::Dir(dir) => (Some(dir.clone()), None),
            TargetMode::Auto => (None, None),
        };
        let extra = config
            .extra_fields()
            .iter()
            .filter(|(k, _)| k.as_str() != "verbosity")
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        RunToml {
            settings: SettingsSection {
                target,
                no_target,
                source: config.source_dir().map(Path::to_path_buf),
                keep_parent_name: (!config.drop_parent_name()).then_some(true),
                recursive: Some(config.recursive()),
                max_depth: config.max_depth(),
                follow_links: config.follow_links().then_some(true),
                extensions: config
                    .allowed_extensions()
                    .map(|set| set.iter().cloned().collect()),
                num_cpus: Some(config.num_workers()),
                verbosity: Some(config.verbosity()),
                next: config.next_stage().map(|s| s.program.clone()),
                next_args: config
                    .next_stage()
                    .filter(|s| !s.args.is_empty())
                    .map(|s| s.args.clone()),
                exec: exec.map(str::to_string),
            },
            extra,
        }
    }
}

/// Write `file` as TOML to `path`.
pub fn save_run_toml(path: &Path, file: &RunToml) -> RunResult<()> {
    let s = toml::to_string_pretty(file).map_err(|e| config_error(path, e))?;
    std::fs::write(path, s).map_err(|source| RunError::Io {
        operation: "write config",
        path: path.to_path_buf(),
        source,
    })
}
