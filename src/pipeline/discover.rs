//! Discovery: walk a root path and collect candidate files in sorted order.
//!
//! Hidden entries (base name starting with `.`) are dropped and hidden directories are not
//! descended into. Without `follow_links` symlinked directories are reported but not entered;
//! with it, walkdir reports ancestor loops as errors, which are logged and skipped.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use walkdir::{DirEntry, WalkDir};

use crate::RunConfig;
use crate::engine::tools::{extension_allowed, is_hidden};
use crate::error::{RunError, RunResult};

/// Filters applied while discovering files.
#[derive(Clone, Debug, Default)]
pub struct DiscoveryOptions {
    /// `None` accepts every extension.
    pub allowed_extensions: Option<BTreeSet<String>>,
    /// Deepest level below the root that is visited (`Some(1)` = direct children only).
    pub max_depth: Option<usize>,
    pub follow_links: bool,
    pub include_hidden: bool,
}

impl From<&RunConfig> for DiscoveryOptions {
    fn from(c: &RunConfig) -> Self {
        DiscoveryOptions {
            allowed_extensions: c.allowed_extensions().cloned(),
            max_depth: c.max_depth(),
            follow_links: c.follow_links(),
            include_hidden: false,
        }
    }
}

/// One result from the directory walk: a file to consider or an error with optional path.
pub enum WalkOutcome {
    File(PathBuf),
    Err { msg: String, path: Option<PathBuf> },
}

/// Convert a walkdir result into [`WalkOutcome`]; directories yield `None`.
pub fn to_outcome_walkdir(r: Result<DirEntry, walkdir::Error>) -> Option<WalkOutcome> {
    match r {
        Ok(entry) if entry.file_type().is_file() => Some(WalkOutcome::File(entry.into_path())),
        Ok(entry) if entry.path_is_symlink() && entry.path().is_file() => {
            Some(WalkOutcome::File(entry.into_path()))
        }
        Ok(_) => None,
        Err(err) => Some(WalkOutcome::Err {
            msg: format!("{}", err),
            path: err.path().map(PathBuf::from),
        }),
    }
}

fn walkdir_iter<'a>(
    root: &Path,
    opts: &'a DiscoveryOptions,
) -> impl Iterator<Item = WalkOutcome> + 'a {
    let mut walker = WalkDir::new(root)
        .follow_links(opts.follow_links)
        .sort_by_file_name();
    if let Some(depth) = opts.max_depth {
        walker = walker.max_depth(depth);
    }
    walker
        .into_iter()
        .filter_entry(move |e| e.depth() == 0 || opts.include_hidden || !is_hidden(e.path()))
        .filter_map(to_outcome_walkdir)
}

/// Consume `iter`, keep files passing the extension filter, log and skip errors.
/// Returns (files, skipped_paths).
pub fn run_walk_loop<I>(iter: I, opts: &DiscoveryOptions) -> (Vec<PathBuf>, Vec<PathBuf>)
where
    I: Iterator<Item = WalkOutcome>,
{
    let mut files = Vec::new();
    let mut skipped = Vec::new();
    for outcome in iter {
        match outcome {
            WalkOutcome::File(path) => {
                if extension_allowed(&path, opts.allowed_extensions.as_ref()) {
                    log::debug!("Found file {}", path.display());
                    files.push(path);
                } else {
                    log::debug!("Skipping {} (extension not allowed)", path.display());
                }
            }
            WalkOutcome::Err { msg, path } => {
                log::warn!("Skipping unreadable path: {}", msg);
                skipped.push(path.unwrap_or_else(|| PathBuf::from("<no-path>")));
            }
        }
    }
    (files, skipped)
}

/// Every file under `root` that passes the filters, in sorted lexical order.
///
/// A file root yields `[root]` unfiltered.
pub fn discover(root: &Path, opts: &DiscoveryOptions) -> RunResult<Vec<PathBuf>> {
    if !root.exists() {
        return Err(RunError::PathNotFound {
            path: root.to_path_buf(),
        });
    }
    if root.is_file() {
        log::debug!("Found file {}", root.display());
        return Ok(vec![root.to_path_buf()]);
    }
    let (files, skipped) = run_walk_loop(walkdir_iter(root, opts), opts);
    if !skipped.is_empty() {
        log::warn!(
            "Skipped {} paths under {} due to permission errors or access issues",
            skipped.len(),
            root.display()
        );
    }
    Ok(files)
}
