//! Sequencer: expand input arguments, merge explicit and discovered files, build descriptors.
//!
//! Order: explicit files in argument order (glob matches sorted within one argument), then the
//! files discovered under directory arguments in argument order. `Placement::Prepend` puts the
//! discovered group first. Consecutive repeats of one path are collapsed; other repeats stay.

use globset::GlobBuilder;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::engine::tools::{format_path_list, is_glob_pattern, is_hidden, should_include_file};
use crate::error::{RunError, RunResult};
use crate::pipeline::descriptor::{DescriptorContext, JobDescriptor};
use crate::pipeline::discover::{DiscoveryOptions, discover};
use crate::{Placement, RunConfig};

/// Ordered descriptors ready for dispatch, plus the inputs rejected as invalid.
#[derive(Debug, Default)]
pub struct JobList {
    pub jobs: Vec<JobDescriptor>,
    pub skipped: Vec<JobDescriptor>,
}

/// Split `pattern` into the literal directory it starts from and the glob components after it.
fn split_pattern(pattern: &str) -> (PathBuf, Vec<String>) {
    let mut base = PathBuf::new();
    let mut rest: Vec<String> = Vec::new();
    for component in Path::new(pattern).components() {
        let part = component.as_os_str().to_string_lossy().into_owned();
        if rest.is_empty() && !is_glob_pattern(&part) {
            base.push(component.as_os_str());
        } else {
            rest.push(part);
        }
    }
    (base, rest)
}

/// Existing paths matching a shell-style glob pattern, sorted. No match yields an empty list.
///
/// Wildcards never cross `/`. Hidden names only match a component that itself starts with `.`.
pub fn expand_glob(pattern: &str) -> Vec<PathBuf> {
    let (base, rest) = split_pattern(pattern);
    if rest.is_empty() {
        return if base.exists() { vec![base] } else { Vec::new() };
    }
    let matcher = match GlobBuilder::new(&rest.join("/"))
        .literal_separator(true)
        .build()
    {
        Ok(glob) => glob.compile_matcher(),
        Err(e) => {
            log::warn!("Invalid glob pattern '{}': {}", pattern, e);
            return Vec::new();
        }
    };
    let walk_root = if base.as_os_str().is_empty() {
        Path::new(".")
    } else {
        base.as_path()
    };
    if !walk_root.is_dir() {
        return Vec::new();
    }
    let depth = rest.len();

    // No min_depth: filter_entry must see the intermediate directories to prune hidden ones.
    let mut found: Vec<PathBuf> = WalkDir::new(walk_root)
        .max_depth(depth)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            let d = e.depth();
            d == 0 || !is_hidden(e.path()) || rest[d - 1].starts_with('.')
        })
        .filter_map(|entry| match entry {
            Ok(e) => Some(e),
            Err(e) => {
                log::warn!("Skipping unreadable entry while matching '{}': {}", pattern, e);
                None
            }
        })
        .filter(|e| e.depth() == depth)
        .filter_map(|e| {
            let rel = e.path().strip_prefix(walk_root).ok()?.to_path_buf();
            matcher.is_match(&rel).then(|| base.join(rel))
        })
        .collect();
    found.sort();
    found
}

/// Expand one argument: glob patterns to their matches, anything else to itself.
pub fn expand_argument(arg: &str) -> Vec<PathBuf> {
    if !is_glob_pattern(arg) {
        return vec![PathBuf::from(arg)];
    }
    let matches = expand_glob(arg);
    if matches.is_empty() {
        log::warn!("No files match '{}'", arg);
    }
    matches
}

/// Ordered candidate paths for `inputs` before filtering and descriptor construction.
pub fn order_candidates(inputs: &[String], config: &RunConfig) -> RunResult<Vec<PathBuf>> {
    let opts = DiscoveryOptions::from(config);
    let mut explicit = Vec::new();
    let mut discovered = Vec::new();
    for arg in inputs {
        for path in expand_argument(arg) {
            if path.is_dir() {
                if config.recursive() {
                    log::debug!("Searching for valid files in {}", path.display());
                    discovered.extend(discover(&path, &opts)?);
                } else {
                    log::warn!(
                        "Skipping {}: it is a directory (use --recursive)",
                        path.display()
                    );
                }
            } else {
                explicit.push(path);
            }
        }
    }
    let mut ordered = match config.discovered_placement() {
        Placement::Append => {
            explicit.extend(discovered);
            explicit
        }
        Placement::Prepend => {
            discovered.extend(explicit);
            discovered
        }
    };
    ordered.dedup();
    Ok(ordered)
}

/// Build the job list for `inputs`.
///
/// Fails with [`RunError::Usage`] when nothing valid remains and recursive discovery was not requested.
pub fn sequence(inputs: &[String], config: &RunConfig) -> RunResult<JobList> {
    log::debug!("Updating sequence of files...");
    if let Some(exts) = config.allowed_extensions() {
        log::debug!(
            "Valid file extensions are {}",
            exts.iter().cloned().collect::<Vec<_>>().join(" ")
        );
    }
    let mut candidates = order_candidates(inputs, config)?;
    candidates.retain(|p| should_include_file(p, config.allowed_extensions()));
    if !candidates.is_empty() {
        log::debug!("Found the following files:\n{}", format_path_list(&candidates));
    }

    let ctx = DescriptorContext::from(config);
    let (jobs, skipped): (Vec<_>, Vec<_>) = candidates
        .into_iter()
        .map(|p| JobDescriptor::build(p, &ctx))
        .partition(JobDescriptor::is_valid);

    if jobs.is_empty() && !config.recursive() {
        return Err(RunError::usage(
            "No input files specified or found. Nothing to do.",
        ));
    }
    Ok(JobList { jobs, skipped })
}
