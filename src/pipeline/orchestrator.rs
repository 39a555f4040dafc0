use std::io::Write;
use std::path::PathBuf;

use crate::error::{RunError, RunResult};
use crate::pipeline::aggregate::summarize;
use crate::pipeline::chain::{CommandLauncher, StageLauncher, hand_off};
use crate::pipeline::dispatch::{Action, dispatch};
use crate::pipeline::sequence::sequence;
use crate::{RunConfig, RunSummary};

/// Main orchestrator: sequence inputs, dispatch, aggregate, write the output to `out`,
/// then hand off to the next stage through `launcher`.
/// Inputs → job list → dispatch (serial or pool) → ordered outcomes → rendered text → next stage.
pub fn run_batch_with_launcher<A>(
    inputs: &[String],
    config: &RunConfig,
    action: &A,
    out: &mut dyn Write,
    launcher: &dyn StageLauncher,
) -> RunResult<RunSummary>
where
    A: Action + ?Sized,
{
    let job_list = sequence(inputs, config)?;
    log::debug!(
        "{} jobs, {} skipped inputs",
        job_list.jobs.len(),
        job_list.skipped.len()
    );
    let report = dispatch(action, &job_list.jobs, config)?;
    let mut summary = summarize(report, job_list.skipped.len(), config.verbosity());

    if let Some(text) = &summary.rendered {
        writeln!(out, "{text}")
            .and_then(|_| out.flush())
            .map_err(|source| RunError::Io {
                operation: "write job output",
                path: PathBuf::from("<output>"),
                source,
            })?;
    }

    summary.next_stage_status = hand_off(config, &summary, launcher)?;
    Ok(summary)
}

/// [`run_batch_with_launcher`] with next stages run as subprocesses.
pub fn run_batch<A>(
    inputs: &[String],
    config: &RunConfig,
    action: &A,
    out: &mut dyn Write,
) -> RunResult<RunSummary>
where
    A: Action + ?Sized,
{
    run_batch_with_launcher(inputs, config, action, out, &CommandLauncher)
}
