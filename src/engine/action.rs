//! Actions used by the CLI: a command template run per job, or a plain description.

use anyhow::{Context, bail};
use std::process::Command;

use crate::RunConfig;
use crate::engine::tools::resolve_executable;
use crate::error::{RunError, RunResult};
use crate::pipeline::{Action, JobDescriptor};

/// Describes each job as `<input> -> <output_dir>`. Used when no command is given.
#[derive(Clone, Copy, Debug, Default)]
pub struct DescribeAction;

impl Action for DescribeAction {
    fn run(&self, job: &JobDescriptor, _config: &RunConfig) -> anyhow::Result<Option<String>> {
        Ok(Some(format!(
            "{} -> {}",
            job.input_path().display(),
            job.output_dir().display()
        )))
    }
}

/// Runs a program per job. Tokens are whitespace-separated; placeholders are expanded per job.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandAction {
    program: String,
    args: Vec<String>,
}

impl CommandAction {
    /// Split `template` and check that its program can be run. A program token holding a
    /// placeholder is only known per job and is not checked here.
    pub fn parse(template: &str) -> RunResult<Self> {
        let mut tokens = template.split_whitespace().map(str::to_string);
        let program = tokens
            .next()
            .ok_or_else(|| RunError::usage("--exec needs a command"))?;
        if !program.contains('{') {
            let found = resolve_executable(&program)?;
            log::debug!("Using {} for {}", found.display(), program);
        }
        Ok(CommandAction {
            program,
            args: tokens.collect(),
        })
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Program and arguments with placeholders filled in for `job`.
    pub fn argv_for(&self, job: &JobDescriptor) -> Vec<String> {
        std::iter::once(&self.program)
            .chain(&self.args)
            .map(|token| expand_placeholders(token, job))
            .collect()
    }
}

fn placeholder_value(name: &str, job: &JobDescriptor) -> Option<String> {
    match name {
        "input" => Some(job.input_path().display().to_string()),
        "input_dir" => Some(job.input_dir().display().to_string()),
        "output_dir" => Some(job.output_dir().display().to_string()),
        "protoname" => Some(job.protoname().to_string()),
        "ext" => Some(job.file_extension().to_string()),
        _ => {
            if let Some(ext) = name.strip_prefix("out:") {
                Some(job.with_extension(ext).display().to_string())
            } else if let Some(key) = name.strip_prefix("extra:") {
                job.extra(key).map(|v| v.to_string())
            } else {
                None
            }
        }
    }
}

/// Replace `{name}` placeholders in `token`; unknown ones are left as written.
pub fn expand_placeholders(token: &str, job: &JobDescriptor) -> String {
    let mut out = String::with_capacity(token.len());
    let mut rest = token;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) => {
                let name = &after[..close];
                match placeholder_value(name, job) {
                    Some(value) => out.push_str(&value),
                    None => {
                        out.push('{');
                        out.push_str(name);
                        out.push('}');
                    }
                }
                rest = &after[close + 1..];
            }
            None => {
                out.push_str(&rest[open..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

impl Action for CommandAction {
    fn run(&self, job: &JobDescriptor, _config: &RunConfig) -> anyhow::Result<Option<String>> {
        let argv = self.argv_for(job);
        log::debug!("{}: running {}", job, argv.join(" "));
        let output = Command::new(&argv[0])
            .args(&argv[1..])
            .output()
            .with_context(|| format!("spawn {}", argv[0]))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("{} exited with {}: {}", argv[0], output.status, stderr.trim());
        }
        let stdout = String::from_utf8_lossy(&output.stdout).trim_end().to_string();
        Ok((!stdout.is_empty()).then_some(stdout))
    }
}
