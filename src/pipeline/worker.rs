//! Worker pool pieces: job queue, scoped worker threads, per-job failure capture.

use crossbeam_channel::{Receiver, Sender, unbounded};
use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::thread::{Scope, ScopedJoinHandle};

use crate::pipeline::descriptor::JobDescriptor;
use crate::pipeline::dispatch::Action;
use crate::{JobFailure, JobOutcome, RunConfig};

/// Reset `SIGCHLD` to its default disposition before starting workers.
///
/// With `SIG_IGN` inherited from the parent, the kernel reaps children of actions on its own
/// and their `wait` fails with `ECHILD`, which stalls or fails every job that spawns a process.
#[cfg(unix)]
pub fn reset_child_signal() {
    let previous = unsafe { libc::signal(libc::SIGCHLD, libc::SIG_DFL) };
    if previous == libc::SIG_IGN {
        log::debug!("SIGCHLD was ignored; restored default disposition");
    }
}

#[cfg(not(unix))]
pub fn reset_child_signal() {}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Run `action` on one job, turning errors and panics into a [`JobFailure`].
pub fn run_job<A>(action: &A, index: usize, job: &JobDescriptor, config: &RunConfig) -> JobOutcome
where
    A: Action + ?Sized,
{
    let failure = |message: String| JobFailure {
        index,
        input_path: job.input_path().to_path_buf(),
        message,
    };
    match catch_unwind(AssertUnwindSafe(|| action.run(job, config))) {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(err)) => Err(failure(format!("{err:#}"))),
        Err(payload) => Err(failure(format!(
            "action panicked: {}",
            panic_message(payload.as_ref())
        ))),
    }
}

/// Queue every job up front (no backpressure) and close the queue.
pub fn enqueue_jobs(jobs: &[JobDescriptor]) -> Receiver<(usize, &JobDescriptor)> {
    let (job_tx, job_rx) = unbounded();
    for (index, job) in jobs.iter().enumerate() {
        // Receiver is alive in this scope; send cannot fail.
        let _ = job_tx.send((index, job));
    }
    drop(job_tx);
    job_rx
}

/// Single worker: take jobs until the queue is empty, send each outcome tagged with its index.
fn worker_loop<A>(
    worker_id: usize,
    job_rx: Receiver<(usize, &JobDescriptor)>,
    result_tx: Sender<(usize, JobOutcome)>,
    action: &A,
    config: &RunConfig,
) where
    A: Action + ?Sized,
{
    let mut done = 0_usize;
    while let Ok((index, job)) = job_rx.recv() {
        let outcome = run_job(action, index, job, config);
        if result_tx.send((index, outcome)).is_err() {
            break;
        }
        done += 1;
    }
    log::debug!("worker {} exiting after {} jobs", worker_id, done);
}

/// Spawn `num_workers` scoped workers. Caller must drop its `result_tx` so the result channel closes.
pub fn spawn_workers<'scope, 'env, A>(
    scope: &'scope Scope<'scope, 'env>,
    job_rx: &Receiver<(usize, &'env JobDescriptor)>,
    result_tx: &Sender<(usize, JobOutcome)>,
    action: &'env A,
    config: &'env RunConfig,
    num_workers: usize,
) -> Vec<ScopedJoinHandle<'scope, ()>>
where
    A: Action + ?Sized,
{
    (0..num_workers)
        .map(|worker_id| {
            let job_rx = job_rx.clone();
            let result_tx = result_tx.clone();
            scope.spawn(move || worker_loop(worker_id, job_rx, result_tx, action, config))
        })
        .collect()
}
