//! Chain controller: hand off to a next stage after a successful run.

use std::process::Command;

use crate::error::{RunError, RunResult};
use crate::utils::config::REDISCOVER_FLAG;
use crate::{NextStage, RunConfig, RunSummary, Verbosity};

/// Everything a next stage receives.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Handoff {
    pub program: String,
    pub args: Vec<String>,
    pub verbosity: Verbosity,
    pub rediscover: bool,
}

impl Handoff {
    pub fn new(stage: &NextStage, verbosity: Verbosity) -> Self {
        Handoff {
            program: stage.program.clone(),
            args: stage.args.clone(),
            verbosity,
            rediscover: true,
        }
    }

    /// Stage arguments followed by the rediscover and verbosity flags.
    pub fn argv(&self) -> Vec<String> {
        let mut argv = self.args.clone();
        if self.rediscover {
            argv.push(REDISCOVER_FLAG.to_string());
        }
        argv.push(self.verbosity.flag().to_string());
        argv
    }
}

/// Starts a next stage and waits for its exit code.
pub trait StageLauncher {
    fn launch(&self, handoff: &Handoff) -> RunResult<i32>;
}

/// Runs the next stage as a subprocess.
#[derive(Clone, Copy, Debug, Default)]
pub struct CommandLauncher;

impl StageLauncher for CommandLauncher {
    fn launch(&self, handoff: &Handoff) -> RunResult<i32> {
        let status = Command::new(&handoff.program)
            .args(handoff.argv())
            .status()
            .map_err(|source| RunError::Stage {
                program: handoff.program.clone(),
                source,
            })?;
        Ok(status.code().unwrap_or(1))
    }
}

/// Launch the configured next stage when the run succeeded. Returns its exit code, if it ran.
pub fn hand_off(
    config: &RunConfig,
    summary: &RunSummary,
    launcher: &dyn StageLauncher,
) -> RunResult<Option<i32>> {
    let Some(stage) = config.next_stage() else {
        return Ok(None);
    };
    if summary.dry_run {
        log::info!("Dry run: not starting next stage {}", stage.program);
        return Ok(None);
    }
    if !summary.failures.is_empty() {
        log::warn!(
            "Not starting next stage {}: {} jobs failed",
            stage.program,
            summary.failures.len()
        );
        return Ok(None);
    }
    let handoff = Handoff::new(stage, config.verbosity());
    log::info!("Handing off to {} {}", handoff.program, handoff.argv().join(" "));
    launcher.launch(&handoff).map(Some)
}
