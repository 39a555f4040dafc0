//! Error taxonomy for the run pipeline.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result alias used by every pipeline component.
pub type RunResult<T> = Result<T, RunError>;

/// Errors that end (or, for descriptors, skip) part of a run.
#[derive(Debug, Error)]
pub enum RunError {
    /// Bad invocation: conflicting flags, missing directory, nothing to do.
    #[error("{0}")]
    Usage(String),
    /// Dispatch was asked to run an empty job list.
    #[error("No input files specified or found. Nothing to do.")]
    NoInput,
    /// An input path or discovery root does not exist.
    #[error("{} does not exist", path.display())]
    PathNotFound { path: PathBuf },
    /// An output directory could not be created.
    #[error("could not create directory {}", path.display())]
    DirectoryCreation {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// The configuration file could not be read or parsed.
    #[error("config {}: {message}", path.display())]
    Config { path: PathBuf, message: String },
    /// Other IO failures, tagged with the operation that hit them.
    #[error("{operation} failed for {}", path.display())]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// The next stage could not be launched.
    #[error("could not launch next stage {program}")]
    Stage {
        program: String,
        #[source]
        source: io::Error,
    },
}

impl RunError {
    pub fn usage(msg: impl Into<String>) -> Self {
        RunError::Usage(msg.into())
    }

    /// True for errors reported as "bad invocation" (one-line message plus help hint).
    pub fn is_usage(&self) -> bool {
        matches!(
            self,
            RunError::Usage(_)
                | RunError::NoInput
                | RunError::PathNotFound { .. }
                | RunError::Config { .. }
        )
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        if self.is_usage() { 2 } else { 1 }
    }
}
