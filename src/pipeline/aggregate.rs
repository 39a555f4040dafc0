//! Result aggregation: restore submission order, render output, summarize failures.

use crate::pipeline::descriptor::JobDescriptor;
use crate::{DispatchMode, DispatchReport, JobFailure, JobOutcome, RunSummary, Verbosity};

/// Line separator between rendered job outputs.
pub const OUTPUT_SEPARATOR: &str = "\n";

/// Fixed slots indexed by submission order; filled in any completion order.
pub struct ResultBuffer {
    slots: Vec<Option<JobOutcome>>,
}

impl ResultBuffer {
    pub fn new(job_count: usize) -> Self {
        ResultBuffer {
            slots: (0..job_count).map(|_| None).collect(),
        }
    }

    pub fn insert(&mut self, index: usize, outcome: JobOutcome) {
        match self.slots.get_mut(index) {
            Some(slot @ None) => *slot = Some(outcome),
            Some(Some(_)) => log::warn!("duplicate result for job {}; keeping the first", index),
            None => log::warn!("result for unknown job {} dropped", index),
        }
    }

    pub fn filled(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Outcomes in submission order. A slot never filled becomes a failure for that job.
    pub fn into_ordered(self, jobs: &[JobDescriptor]) -> Vec<JobOutcome> {
        self.slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| {
                slot.unwrap_or_else(|| {
                    Err(JobFailure {
                        index,
                        input_path: jobs
                            .get(index)
                            .map(|j| j.input_path().to_path_buf())
                            .unwrap_or_default(),
                        message: "no result collected".to_string(),
                    })
                })
            })
            .collect()
    }
}

/// Join the non-empty outputs with [`OUTPUT_SEPARATOR`]. `None` when silenced or nothing to show.
pub fn render(outcomes: &[JobOutcome], verbosity: Verbosity) -> Option<String> {
    if verbosity.suppresses_output() {
        return None;
    }
    let parts: Vec<&str> = outcomes
        .iter()
        .filter_map(|o| o.as_ref().ok())
        .filter_map(|text| text.as_deref())
        .filter(|text| !text.is_empty())
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(OUTPUT_SEPARATOR))
    }
}

/// Fold a dispatch report into a [`RunSummary`], logging each failed job.
pub fn summarize(report: DispatchReport, skipped: usize, verbosity: Verbosity) -> RunSummary {
    let rendered = render(&report.outcomes, verbosity);
    let mut succeeded = 0;
    let mut failures = Vec::new();
    for outcome in report.outcomes {
        match outcome {
            Ok(_) => succeeded += 1,
            Err(failure) => {
                log::error!("job failed: {}", failure);
                failures.push(failure);
            }
        }
    }
    if !failures.is_empty() {
        log::warn!("{} of {} jobs failed", failures.len(), failures.len() + succeeded);
    }
    if skipped > 0 {
        log::warn!("Skipped {} invalid inputs", skipped);
    }
    RunSummary {
        rendered,
        succeeded,
        failures,
        skipped,
        dry_run: report.mode == DispatchMode::DryRun,
        next_stage_status: None,
    }
}
