//! Pipeline components: discovery, descriptors, sequencing, dispatch, aggregation, chaining.

pub mod aggregate;
pub mod chain;
pub mod descriptor;
pub mod discover;
pub mod dispatch;
pub mod orchestrator;
pub mod sequence;
pub mod worker;

pub use aggregate::{ResultBuffer, render, summarize};
pub use chain::{CommandLauncher, Handoff, StageLauncher, hand_off};
pub use descriptor::{
    DescriptorContext, JobDescriptor, ensure_output_dir, input_dir_of, mirror_output_dir,
};
pub use discover::{DiscoveryOptions, WalkOutcome, discover, run_walk_loop};
pub use dispatch::{
    Action, DispatchState, Dispatcher, dispatch, effective_workers, prepare_output_dirs,
};
pub use orchestrator::{run_batch, run_batch_with_launcher};
pub use sequence::{JobList, expand_argument, expand_glob, order_candidates, sequence};
pub use worker::{reset_child_signal, run_job};
