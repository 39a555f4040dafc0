//! Public types for the run pipeline: run configuration, extra fields, outcomes.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{RunError, RunResult};
use crate::utils::config::WorkerLimits;
use crate::utils::target::construct_target;

/// Descriptor field names and the injected `verbosity`; extra fields may not shadow them.
pub const RESERVED_FIELD_NAMES: [&str; 7] = [
    "input_path",
    "input_dir",
    "file_extension",
    "protoname",
    "output_dir",
    "valid",
    "verbosity",
];

/// Verbosity level, ordered from quietest to loudest.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verbosity {
    Silent,
    Quiet,
    #[default]
    Info,
    Debug,
}

impl Verbosity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verbosity::Silent => "silent",
            Verbosity::Quiet => "quiet",
            Verbosity::Info => "info",
            Verbosity::Debug => "debug",
        }
    }

    /// CLI flag selecting this level (forwarded to chained stages).
    pub fn flag(&self) -> &'static str {
        match self {
            Verbosity::Silent => "--silent",
            Verbosity::Quiet => "--quiet",
            Verbosity::Info => "--info",
            Verbosity::Debug => "--debug",
        }
    }

    /// Rendered job output is dropped at or below this level.
    pub fn suppresses_output(&self) -> bool {
        *self <= Verbosity::Silent
    }
}

impl fmt::Display for Verbosity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where job output goes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum TargetMode {
    /// Write beside the current directory; no mirroring.
    NoTarget,
    /// Mirror into this root.
    Dir(PathBuf),
    /// Generate `<program>_<date>_<user>.<n>` once per run.
    #[default]
    Auto,
}

/// Where files found by directory discovery go relative to explicit files.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Placement {
    #[default]
    Append,
    Prepend,
}

/// Value kinds allowed in [`ExtraFields`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExtraValue {
    Bool(bool),
    Int(i64),
    Text(String),
}

impl fmt::Display for ExtraValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtraValue::Bool(b) => write!(f, "{b}"),
            ExtraValue::Int(i) => write!(f, "{i}"),
            ExtraValue::Text(s) => f.write_str(s),
        }
    }
}

/// Named values merged into every descriptor.
pub type ExtraFields = BTreeMap<String, ExtraValue>;

/// Validate an extra-field key: identifier-shaped and not a descriptor field.
pub fn validate_extra_key(key: &str) -> RunResult<()> {
    let mut chars = key.chars();
    let well_formed = match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };
    if !well_formed {
        return Err(RunError::usage(format!("invalid extra field name '{key}'")));
    }
    if RESERVED_FIELD_NAMES.contains(&key) {
        return Err(RunError::usage(format!(
            "extra field '{key}' shadows a reserved field"
        )));
    }
    Ok(())
}

/// A stage to run after this one completes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NextStage {
    pub program: String,
    pub args: Vec<String>,
}

/// Immutable per-invocation configuration. Build with [`RunConfig::builder`].
#[derive(Clone, Debug)]
pub struct RunConfig {
    program_name: String,
    num_workers: usize,
    source_dir: Option<PathBuf>,
    target: TargetMode,
    resolved_target: Option<PathBuf>,
    drop_parent_name: bool,
    allowed_extensions: Option<BTreeSet<String>>,
    dry_run: bool,
    recursive: bool,
    max_depth: Option<usize>,
    follow_links: bool,
    discovered_placement: Placement,
    verbosity: Verbosity,
    next_stage: Option<NextStage>,
    extra_fields: ExtraFields,
}

impl RunConfig {
    pub fn builder() -> RunConfigBuilder {
        RunConfigBuilder::default()
    }

    pub fn program_name(&self) -> &str {
        &self.program_name
    }

    /// Requested worker count (>= 1).
    pub fn num_workers(&self) -> usize {
        self.num_workers
    }

    pub fn source_dir(&self) -> Option<&Path> {
        self.source_dir.as_deref()
    }

    pub fn target(&self) -> &TargetMode {
        &self.target
    }

    /// Target root after resolving [`TargetMode::Auto`]; `None` in no-target mode.
    pub fn resolved_target(&self) -> Option<&Path> {
        self.resolved_target.as_deref()
    }

    pub fn drop_parent_name(&self) -> bool {
        self.drop_parent_name
    }

    pub fn allowed_extensions(&self) -> Option<&BTreeSet<String>> {
        self.allowed_extensions.as_ref()
    }

    pub fn dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn recursive(&self) -> bool {
        self.recursive
    }

    pub fn max_depth(&self) -> Option<usize> {
        self.max_depth
    }

    pub fn follow_links(&self) -> bool {
        self.follow_links
    }

    pub fn discovered_placement(&self) -> Placement {
        self.discovered_placement
    }

    pub fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    pub fn next_stage(&self) -> Option<&NextStage> {
        self.next_stage.as_ref()
    }

    /// Extra fields including the injected `verbosity` entry.
    pub fn extra_fields(&self) -> &ExtraFields {
        &self.extra_fields
    }
}

/// Builder for [`RunConfig`]; `build` validates and resolves the target.
#[derive(Default)]
pub struct RunConfigBuilder {
    program_name: Option<String>,
    num_workers: Option<usize>,
    source_dir: Option<PathBuf>,
    target: TargetMode,
    keep_parent_name: bool,
    allowed_extensions: Option<Vec<String>>,
    dry_run: bool,
    recursive: bool,
    max_depth: Option<usize>,
    follow_links: bool,
    discovered_placement: Placement,
    verbosity: Verbosity,
    next_stage: Option<NextStage>,
    extra_fields: ExtraFields,
}

impl RunConfigBuilder {
    pub fn program_name(mut self, name: impl Into<String>) -> Self {
        self.program_name = Some(name.into());
        self
    }

    pub fn num_workers(mut self, n: usize) -> Self {
        self.num_workers = Some(n);
        self
    }

    pub fn source_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.source_dir = Some(dir.into());
        self
    }

    pub fn target(mut self, target: TargetMode) -> Self {
        self.target = target;
        self
    }

    /// Keep the source root's own name under the target (`drop_parent_name = false`).
    pub fn keep_parent_name(mut self, keep: bool) -> Self {
        self.keep_parent_name = keep;
        self
    }

    pub fn allowed_extensions<I, S>(mut self, exts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_extensions = Some(exts.into_iter().map(Into::into).collect());
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    pub fn max_depth(mut self, depth: Option<usize>) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn follow_links(mut self, follow: bool) -> Self {
        self.follow_links = follow;
        self
    }

    pub fn discovered_placement(mut self, placement: Placement) -> Self {
        self.discovered_placement = placement;
        self
    }

    pub fn verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    pub fn next_stage(mut self, stage: Option<NextStage>) -> Self {
        self.next_stage = stage;
        self
    }

    pub fn extra_field(mut self, key: impl Into<String>, value: ExtraValue) -> Self {
        self.extra_fields.insert(key.into(), value);
        self
    }

    pub fn build(self) -> RunResult<RunConfig> {
        let program_name = self
            .program_name
            .unwrap_or_else(|| env!("CARGO_PKG_NAME").to_string());

        let num_workers = self
            .num_workers
            .unwrap_or_else(|| WorkerLimits::current().default_workers());
        if num_workers == 0 {
            return Err(RunError::usage("number of CPUs must be at least 1"));
        }

        let resolved_target = match &self.target {
            TargetMode::NoTarget => None,
            TargetMode::Dir(dir) if dir.as_os_str().is_empty() => {
                return Err(RunError::usage("target directory must not be empty"));
            }
            TargetMode::Dir(dir) => Some(dir.clone()),
            TargetMode::Auto => Some(construct_target(&program_name)),
        };

        let allowed_extensions = match self.allowed_extensions {
            None => None,
            Some(exts) => {
                let mut set = BTreeSet::new();
                for ext in exts {
                    let ext = ext.trim_start_matches('.').to_string();
                    if ext.is_empty() {
                        return Err(RunError::usage("empty file extension in allow-list"));
                    }
                    set.insert(ext);
                }
                Some(set)
            }
        };

        let mut extra_fields = self.extra_fields;
        for key in extra_fields.keys() {
            validate_extra_key(key)?;
        }
        extra_fields.insert(
            "verbosity".to_string(),
            ExtraValue::Text(self.verbosity.as_str().to_string()),
        );

        Ok(RunConfig {
            program_name,
            num_workers,
            source_dir: self.source_dir,
            target: self.target,
            resolved_target,
            drop_parent_name: !self.keep_parent_name,
            allowed_extensions,
            dry_run: self.dry_run,
            recursive: self.recursive,
            max_depth: self.max_depth,
            follow_links: self.follow_links,
            discovered_placement: self.discovered_placement,
            verbosity: self.verbosity,
            next_stage: self.next_stage,
            extra_fields,
        })
    }
}

/// A job whose action returned an error or panicked.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JobFailure {
    /// Submission index of the job.
    pub index: usize,
    pub input_path: PathBuf,
    pub message: String,
}

impl fmt::Display for JobFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.input_path.display(), self.message)
    }
}

/// Outcome of one job: optional output text, or a failure.
pub type JobOutcome = Result<Option<String>, JobFailure>;

/// How a dispatch ran.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DispatchMode {
    /// Single worker, on the calling thread, no pool.
    Serial,
    /// Worker pool of `DispatchReport::workers` threads.
    Pooled,
    /// Nothing ran.
    DryRun,
}

/// What [`dispatch`](crate::pipeline::dispatch) did, with outcomes in submission order.
#[derive(Debug)]
pub struct DispatchReport {
    pub mode: DispatchMode,
    pub workers: usize,
    pub would_run: Vec<PathBuf>,
    pub outcomes: Vec<JobOutcome>,
}

/// Result of a whole run.
#[derive(Debug, Default)]
pub struct RunSummary {
    /// Joined job output; `None` when silenced or empty.
    pub rendered: Option<String>,
    pub succeeded: usize,
    pub failures: Vec<JobFailure>,
    /// Inputs dropped as invalid descriptors.
    pub skipped: usize,
    pub dry_run: bool,
    /// Exit code of the chained stage, when one ran.
    pub next_stage_status: Option<i32>,
}

impl RunSummary {
    /// Process exit code for this run.
    pub fn exit_code(&self) -> i32 {
        if let Some(code) = self.next_stage_status {
            return code;
        }
        if self.failures.is_empty() { 0 } else { 1 }
    }
}
