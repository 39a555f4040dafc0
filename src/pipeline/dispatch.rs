//! Dispatcher: runs the action over every job, serially or on a bounded worker pool.
//!
//! States: `Idle -> Dispatching -> Collecting -> Done`. A [`Dispatcher`] is consumed by
//! [`Dispatcher::run`], so a run cannot be restarted.

use crossbeam_channel::unbounded;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::thread;

use crate::engine::tools::format_path_list;
use crate::error::{RunError, RunResult};
use crate::pipeline::aggregate::ResultBuffer;
use crate::pipeline::descriptor::{JobDescriptor, ensure_output_dir};
use crate::pipeline::worker::{enqueue_jobs, reset_child_signal, run_job, spawn_workers};
use crate::{DispatchMode, DispatchReport, JobOutcome, RunConfig};

/// Work performed per job. Returns optional text to include in the run output.
///
/// Implemented for any `Fn(&JobDescriptor, &RunConfig) -> anyhow::Result<Option<String>> + Sync`.
pub trait Action: Sync {
    fn run(&self, job: &JobDescriptor, config: &RunConfig) -> anyhow::Result<Option<String>>;
}

impl<F> Action for F
where
    F: Fn(&JobDescriptor, &RunConfig) -> anyhow::Result<Option<String>> + Sync,
{
    fn run(&self, job: &JobDescriptor, config: &RunConfig) -> anyhow::Result<Option<String>> {
        self(job, config)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum DispatchState {
    Idle,
    Dispatching,
    Collecting,
    Done,
}

/// `min(requested, job_count)` with a floor of 1.
pub fn effective_workers(requested: usize, job_count: usize) -> usize {
    requested.min(job_count).max(1)
}

/// Create every distinct output directory referenced by `jobs`.
pub fn prepare_output_dirs(jobs: &[JobDescriptor]) -> RunResult<()> {
    let dirs: BTreeSet<&Path> = jobs.iter().map(JobDescriptor::output_dir).collect();
    for dir in dirs {
        ensure_output_dir(dir)?;
    }
    Ok(())
}

pub struct Dispatcher<'a, A: ?Sized> {
    action: &'a A,
    config: &'a RunConfig,
    state: DispatchState,
}

impl<'a, A> Dispatcher<'a, A>
where
    A: Action + ?Sized,
{
    pub fn new(action: &'a A, config: &'a RunConfig) -> Self {
        Dispatcher {
            action,
            config,
            state: DispatchState::Idle,
        }
    }

    pub fn state(&self) -> DispatchState {
        self.state
    }

    fn advance(&mut self, next: DispatchState) {
        debug_assert!(next > self.state, "dispatch state cannot move backwards");
        log::debug!("dispatch: {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    /// Run every valid job in `jobs`. Outcomes come back in submission order.
    pub fn run(mut self, jobs: &[JobDescriptor]) -> RunResult<DispatchReport> {
        let valid: Vec<JobDescriptor> = jobs.iter().filter(|j| j.is_valid()).cloned().collect();
        if valid.len() < jobs.len() {
            log::warn!(
                "Dropping {} invalid descriptors before dispatch",
                jobs.len() - valid.len()
            );
        }
        if valid.is_empty() {
            return Err(RunError::NoInput);
        }

        if self.config.dry_run() {
            let would_run: Vec<PathBuf> =
                valid.iter().map(|j| j.input_path().to_path_buf()).collect();
            log::info!("Test run. Nothing done.");
            log::info!(
                "I would have acted on the following files:\n{}",
                format_path_list(&would_run)
            );
            self.advance(DispatchState::Done);
            return Ok(DispatchReport {
                mode: DispatchMode::DryRun,
                workers: 0,
                would_run,
                outcomes: Vec::new(),
            });
        }

        prepare_output_dirs(&valid)?;

        let workers = effective_workers(self.config.num_workers(), valid.len());
        let (mode, outcomes) = if workers == 1 {
            log::debug!("Worker pool disabled");
            (DispatchMode::Serial, self.run_serial(&valid))
        } else {
            (DispatchMode::Pooled, self.run_pooled(&valid, workers))
        };
        self.advance(DispatchState::Done);
        Ok(DispatchReport {
            mode,
            workers,
            would_run: Vec::new(),
            outcomes,
        })
    }

    fn run_serial(&mut self, jobs: &[JobDescriptor]) -> Vec<JobOutcome> {
        self.advance(DispatchState::Dispatching);
        let outcomes = jobs
            .iter()
            .enumerate()
            .map(|(index, job)| run_job(self.action, index, job, self.config))
            .collect();
        self.advance(DispatchState::Collecting);
        outcomes
    }

    fn run_pooled(&mut self, jobs: &[JobDescriptor], workers: usize) -> Vec<JobOutcome> {
        reset_child_signal();
        let action = self.action;
        let config = self.config;
        let job_rx = enqueue_jobs(jobs);
        let (result_tx, result_rx) = unbounded();

        thread::scope(|scope| {
            let handles = spawn_workers(scope, &job_rx, &result_tx, action, config, workers);
            log::debug!("Initialized pool of {} workers", handles.len());
            self.advance(DispatchState::Dispatching);
            // Dropping the last sender closes the channel once every worker exits.
            drop(result_tx);
            drop(job_rx);

            self.advance(DispatchState::Collecting);
            let mut buffer = ResultBuffer::new(jobs.len());
            for (index, outcome) in result_rx.iter() {
                buffer.insert(index, outcome);
            }
            for handle in handles {
                if handle.join().is_err() {
                    log::error!("worker thread panicked outside a job");
                }
            }
            buffer.into_ordered(jobs)
        })
    }
}

/// Run `action` over `jobs` with the worker bound and dry-run setting from `config`.
pub fn dispatch<A>(action: &A, jobs: &[JobDescriptor], config: &RunConfig) -> RunResult<DispatchReport>
where
    A: Action + ?Sized,
{
    Dispatcher::new(action, config).run(jobs)
}
