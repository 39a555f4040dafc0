use anyhow::bail;
use batchrun::pipeline::{
    DescriptorContext, DispatchState, Dispatcher, JobDescriptor, dispatch, effective_workers,
    prepare_output_dirs,
};
use batchrun::{DispatchMode, RunConfig, RunError, TargetMode};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

type Out = anyhow::Result<Option<String>>;

fn make_inputs(root: &Path, n: usize) -> Vec<PathBuf> {
    let src = root.join("src");
    fs::create_dir_all(&src).unwrap();
    (0..n)
        .map(|i| {
            let p = src.join(format!("f{i}.txt"));
            fs::write(&p, format!("{i}")).unwrap();
            p
        })
        .collect()
}

fn config(root: &Path, workers: usize, dry_run: bool) -> RunConfig {
    RunConfig::builder()
        .num_workers(workers)
        .source_dir(root.join("src"))
        .target(TargetMode::Dir(root.join("out")))
        .dry_run(dry_run)
        .build()
        .unwrap()
}

fn jobs_for(inputs: &[PathBuf], config: &RunConfig) -> Vec<JobDescriptor> {
    let ctx = DescriptorContext::from(config);
    inputs.iter().map(|p| JobDescriptor::build(p, &ctx)).collect()
}

fn index_of(job: &JobDescriptor) -> usize {
    job.protoname().trim_start_matches('f').parse().unwrap()
}

// --- effective_workers ---

#[test]
fn test_effective_workers_bounds() {
    assert_eq!(effective_workers(4, 10), 4);
    assert_eq!(effective_workers(8, 3), 3);
    assert_eq!(effective_workers(4, 0), 1);
    assert_eq!(effective_workers(1, 5), 1);
}

// --- serial / pooled ---

#[test]
fn test_single_worker_runs_serially_on_caller_thread() {
    let dir = tempfile::tempdir().unwrap();
    let inputs = make_inputs(dir.path(), 3);
    let cfg = config(dir.path(), 1, false);
    let jobs = jobs_for(&inputs, &cfg);
    let caller = thread::current().id();
    let action = |job: &JobDescriptor, _: &RunConfig| -> Out {
        assert_eq!(thread::current().id(), caller);
        Ok(Some(job.protoname().to_string()))
    };
    let report = dispatch(&action, &jobs, &cfg).unwrap();
    assert_eq!(report.mode, DispatchMode::Serial);
    assert_eq!(report.workers, 1);
    let texts: Vec<_> = report.outcomes.into_iter().map(|o| o.unwrap().unwrap()).collect();
    assert_eq!(texts, vec!["f0", "f1", "f2"]);
}

#[test]
fn test_one_job_with_many_workers_is_serial() {
    let dir = tempfile::tempdir().unwrap();
    let inputs = make_inputs(dir.path(), 1);
    let cfg = config(dir.path(), 8, false);
    let jobs = jobs_for(&inputs, &cfg);
    let report = dispatch(&|_: &JobDescriptor, _: &RunConfig| -> Out { Ok(None) }, &jobs, &cfg).unwrap();
    assert_eq!(report.mode, DispatchMode::Serial);
}

#[test]
fn test_pool_preserves_submission_order() {
    let dir = tempfile::tempdir().unwrap();
    let n = 6;
    let inputs = make_inputs(dir.path(), n);
    let cfg = config(dir.path(), 3, false);
    let jobs = jobs_for(&inputs, &cfg);
    // Earlier jobs sleep longer, so completion order is roughly reversed.
    let action = |job: &JobDescriptor, _: &RunConfig| -> Out {
        let i = index_of(job);
        thread::sleep(Duration::from_millis(((n - i) * 15) as u64));
        Ok(Some(format!("done {i}")))
    };
    let report = dispatch(&action, &jobs, &cfg).unwrap();
    assert_eq!(report.mode, DispatchMode::Pooled);
    assert_eq!(report.workers, 3);
    let texts: Vec<String> = report.outcomes.into_iter().map(|o| o.unwrap().unwrap()).collect();
    let expected: Vec<String> = (0..n).map(|i| format!("done {i}")).collect();
    assert_eq!(texts, expected);
}

#[test]
fn test_pool_never_exceeds_worker_bound() {
    let dir = tempfile::tempdir().unwrap();
    let inputs = make_inputs(dir.path(), 5);
    let cfg = config(dir.path(), 2, false);
    let jobs = jobs_for(&inputs, &cfg);
    let threads = Mutex::new(HashSet::new());
    let running = AtomicUsize::new(0);
    let peak = AtomicUsize::new(0);
    let action = |_: &JobDescriptor, _: &RunConfig| -> Out {
        threads.lock().unwrap().insert(thread::current().id());
        let now = running.fetch_add(1, Ordering::SeqCst) + 1;
        peak.fetch_max(now, Ordering::SeqCst);
        thread::sleep(Duration::from_millis(20));
        running.fetch_sub(1, Ordering::SeqCst);
        Ok(None)
    };
    let report = dispatch(&action, &jobs, &cfg).unwrap();
    assert_eq!(report.outcomes.len(), 5);
    assert!(threads.lock().unwrap().len() <= 2);
    assert!(peak.load(Ordering::SeqCst) <= 2);
}

#[test]
fn test_each_job_runs_exactly_once() {
    let dir = tempfile::tempdir().unwrap();
    let inputs = make_inputs(dir.path(), 20);
    let cfg = config(dir.path(), 4, false);
    let jobs = jobs_for(&inputs, &cfg);
    let seen = Mutex::new(Vec::new());
    let action = |job: &JobDescriptor, _: &RunConfig| -> Out {
        seen.lock().unwrap().push(index_of(job));
        Ok(None)
    };
    dispatch(&action, &jobs, &cfg).unwrap();
    let mut seen = seen.into_inner().unwrap();
    seen.sort();
    assert_eq!(seen, (0..20).collect::<Vec<_>>());
}

// --- failures ---

#[test]
fn test_failing_job_does_not_stop_siblings() {
    let dir = tempfile::tempdir().unwrap();
    let inputs = make_inputs(dir.path(), 4);
    let cfg = config(dir.path(), 2, false);
    let jobs = jobs_for(&inputs, &cfg);
    let action = |job: &JobDescriptor, _: &RunConfig| -> Out {
        let i = index_of(job);
        if i == 1 {
            bail!("bad input {i}");
        }
        if i == 2 {
            panic!("boom");
        }
        Ok(Some(format!("ok {i}")))
    };
    let report = dispatch(&action, &jobs, &cfg).unwrap();
    let outcomes = report.outcomes;
    assert_eq!(outcomes.len(), 4);
    assert_eq!(outcomes[0].as_ref().unwrap().as_deref(), Some("ok 0"));
    let err = outcomes[1].as_ref().unwrap_err();
    assert_eq!(err.index, 1);
    assert!(err.message.contains("bad input 1"));
    let panicked = outcomes[2].as_ref().unwrap_err();
    assert!(panicked.message.contains("boom"));
    assert_eq!(outcomes[3].as_ref().unwrap().as_deref(), Some("ok 3"));
}

// --- dry run ---

#[test]
fn test_dry_run_invokes_nothing_and_creates_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let inputs = make_inputs(dir.path(), 3);
    let cfg = config(dir.path(), 2, true);
    let jobs = jobs_for(&inputs, &cfg);
    let calls = AtomicUsize::new(0);
    let action = |_: &JobDescriptor, _: &RunConfig| -> Out {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(None)
    };
    let report = dispatch(&action, &jobs, &cfg).unwrap();
    assert_eq!(report.mode, DispatchMode::DryRun);
    assert_eq!(report.would_run, inputs);
    assert!(report.outcomes.is_empty());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(!dir.path().join("out").exists());
}

// --- output directories ---

#[test]
fn test_output_dirs_created_before_actions() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    let nested = root.join("src").join("deep").join("n.txt");
    fs::create_dir_all(nested.parent().unwrap()).unwrap();
    fs::write(&nested, "x").unwrap();
    let cfg = config(root, 2, false);
    let jobs = jobs_for(&[nested], &cfg);
    let action = |job: &JobDescriptor, _: &RunConfig| -> Out {
        assert!(job.output_dir().is_dir());
        fs::write(job.with_extension("out"), "done")?;
        Ok(None)
    };
    let report = dispatch(&action, &jobs, &cfg).unwrap();
    assert!(report.outcomes[0].is_ok());
    assert!(root.join("out").join("deep").join("n.out").is_file());
}

#[test]
fn test_prepare_output_dirs_dedups() {
    let dir = tempfile::tempdir().unwrap();
    let inputs = make_inputs(dir.path(), 3);
    let cfg = config(dir.path(), 1, false);
    let jobs = jobs_for(&inputs, &cfg);
    prepare_output_dirs(&jobs).unwrap();
    assert!(dir.path().join("out").is_dir());
}

#[test]
fn test_blocked_output_dir_aborts_before_any_action() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    let inputs = make_inputs(root, 3);
    fs::write(root.join("out"), "not a directory").unwrap();
    let cfg = config(root, 2, false);
    let jobs = jobs_for(&inputs, &cfg);
    let calls = AtomicUsize::new(0);
    let action = |_: &JobDescriptor, _: &RunConfig| -> Out {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(None)
    };
    let err = dispatch(&action, &jobs, &cfg).unwrap_err();
    assert!(
        matches!(&err, RunError::DirectoryCreation { path, .. } if path == &root.join("out")),
        "{err}"
    );
    assert_eq!(err.exit_code(), 1);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

// --- empty / invalid ---

#[test]
fn test_empty_job_list_is_no_input() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(dir.path(), 2, false);
    let err = dispatch(&|_: &JobDescriptor, _: &RunConfig| -> Out { Ok(None) }, &[], &cfg).unwrap_err();
    assert!(matches!(err, RunError::NoInput));
}

#[test]
fn test_invalid_descriptors_never_dispatched() {
    let dir = tempfile::tempdir().unwrap();
    let mut inputs = make_inputs(dir.path(), 2);
    inputs.insert(1, dir.path().join("src").join("missing.txt"));
    let cfg = config(dir.path(), 2, false);
    let jobs = jobs_for(&inputs, &cfg);
    assert!(!jobs[1].is_valid());
    let action = |job: &JobDescriptor, _: &RunConfig| -> Out {
        assert!(job.input_path().exists());
        Ok(Some(job.protoname().to_string()))
    };
    let report = dispatch(&action, &jobs, &cfg).unwrap();
    let texts: Vec<_> = report.outcomes.into_iter().map(|o| o.unwrap().unwrap()).collect();
    assert_eq!(texts, vec!["f0", "f1"]);
}

#[test]
fn test_dispatcher_starts_idle() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(dir.path(), 1, false);
    let action = |_: &JobDescriptor, _: &RunConfig| -> Out { Ok(None) };
    let dispatcher = Dispatcher::new(&action, &cfg);
    assert_eq!(dispatcher.state(), DispatchState::Idle);
}
