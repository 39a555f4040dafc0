//! Batchrun: run an action over many input files on a bounded worker pool,
//! mirroring the input layout into an output directory.

pub mod engine;
pub mod error;
pub mod pipeline;
pub mod types;
pub mod utils;

/// Re-export types for API
pub use types::*;

pub use error::{RunError, RunResult};
pub use pipeline::{
    Action, Dispatcher, JobDescriptor, JobList, dispatch, run_batch, run_batch_with_launcher,
    sequence,
};
