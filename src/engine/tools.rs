//! Path and filter utilities

use std::collections::BTreeSet;
use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};

use crate::error::{RunError, RunResult};
use crate::utils::config::GLOB_CHARS;

/// True if the base name starts with `.` (`.` and `..` themselves are not hidden).
pub fn is_hidden(path: &Path) -> bool {
    match path.file_name().and_then(|n| n.to_str()) {
        Some(name) => name.starts_with('.') && name != "." && name != "..",
        None => false,
    }
}

/// Suffix after the last `.` of the file name, without the separator. Empty if none.
pub fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// File name without directory or extension.
pub fn protoname_of(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// `None` allows everything; otherwise the extension must be in the set.
pub fn extension_allowed(path: &Path, allowed: Option<&BTreeSet<String>>) -> bool {
    match allowed {
        None => true,
        Some(set) => set.contains(&extension_of(path)),
    }
}

/// Returns true if `path` passes the hidden-file and extension filters.
pub fn should_include_file(path: &Path, allowed: Option<&BTreeSet<String>>) -> bool {
    if is_hidden(path) {
        log::debug!("Skipping hidden file '{}'", path.display());
        return false;
    }
    if !extension_allowed(path, allowed) {
        log::debug!(
            "Skipping '{}' because file does not have a valid file extension",
            path.display()
        );
        return false;
    }
    true
}

/// Normal components of `path`: drops root, prefix, `.` and `..`.
pub fn normal_components(path: &Path) -> Vec<OsString> {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_os_string()),
            _ => None,
        })
        .collect()
}

/// True if `path` is `.` or empty (the current directory).
pub fn is_current_dir(path: &Path) -> bool {
    path.components().all(|c| c == Component::CurDir)
}

/// True if the argument contains glob metacharacters.
pub fn is_glob_pattern(arg: &str) -> bool {
    arg.contains(GLOB_CHARS)
}

/// True if `path` is a regular file with an execute bit set (any regular file off unix).
pub fn is_executable(path: &Path) -> bool {
    if !path.is_file() {
        return false;
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        path.metadata()
            .map(|m| m.permissions().mode() & 0o111 != 0)
            .unwrap_or(false)
    }
    #[cfg(not(unix))]
    {
        true
    }
}

/// Locate `program`: searched in `dirs`, then `PATH`. A name containing a separator is
/// checked as given. Fails with [`RunError::Usage`] when nothing executable is found.
pub fn find_executable(program: &str, dirs: &[PathBuf]) -> RunResult<PathBuf> {
    let candidate = Path::new(program);
    if candidate.components().count() > 1 {
        return if is_executable(candidate) {
            Ok(candidate.to_path_buf())
        } else {
            Err(RunError::usage(format!("'{program}' is not an executable file")))
        };
    }
    let path_dirs = std::env::var_os("PATH")
        .map(|paths| std::env::split_paths(&paths).collect::<Vec<_>>())
        .unwrap_or_default();
    dirs.iter()
        .chain(&path_dirs)
        .filter(|dir| !dir.as_os_str().is_empty())
        .map(|dir| dir.join(program))
        .find(|full| is_executable(full))
        .ok_or_else(|| {
            RunError::usage(format!("unable to find executable '{program}' on PATH"))
        })
}

/// [`find_executable`] over `PATH` only.
pub fn resolve_executable(program: &str) -> RunResult<PathBuf> {
    find_executable(program, &[])
}

/// Render a list of paths one per line, quoted, for logging.
pub fn format_path_list(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| format!("  '{}'", p.display()))
        .collect::<Vec<_>>()
        .join("\n")
}
