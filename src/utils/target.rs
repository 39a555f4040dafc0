//! Auto-generated target directory names: `<program>_<MM-DD-YYYY>_<user>.<n>`.

use std::path::{Path, PathBuf};

/// Strip a trailing script suffix such as `.py` or `.rs` (and anything after it).
fn program_stem(name: &str) -> &str {
    let base = Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(name);
    [".py", ".rs"]
        .iter()
        .filter_map(|suffix| base.find(suffix))
        .min()
        .map(|i| &base[..i])
        .unwrap_or(base)
}

fn current_user() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .ok()
        .filter(|u| !u.trim().is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Stem shared by every candidate name for `program` today.
pub fn target_stem(program: &str) -> String {
    let date = chrono::Local::now().format("%m-%d-%Y");
    format!("{}_{}_{}", program_stem(program), date, current_user())
}

/// First `<stem>.<n>` under `parent` that does not exist yet.
pub fn first_free_target(parent: &Path, stem: &str) -> PathBuf {
    (0_usize..)
        .map(|i| parent.join(format!("{stem}.{i}")))
        .find(|candidate| !candidate.exists())
        .unwrap_or_else(|| parent.join(stem))
}

/// Target name for `program` relative to the working directory.
pub fn construct_target(program: &str) -> PathBuf {
    let stem = target_stem(program);
    let found = first_free_target(Path::new("."), &stem);
    found
        .strip_prefix(".")
        .map(Path::to_path_buf)
        .unwrap_or(found)
}
