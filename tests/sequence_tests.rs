use batchrun::pipeline::{expand_glob, order_candidates, sequence};
use batchrun::{Placement, RunConfig, RunError, TargetMode};
use std::fs;
use std::path::{Path, PathBuf};

fn touch(root: &Path, rel: &str) -> PathBuf {
    let p = root.join(rel);
    if let Some(parent) = p.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&p, "x").unwrap();
    p
}

fn arg(p: &Path) -> String {
    p.display().to_string()
}

fn config(root: &Path, recursive: bool, placement: Placement) -> RunConfig {
    RunConfig::builder()
        .num_workers(1)
        .target(TargetMode::Dir(root.join("out")))
        .recursive(recursive)
        .discovered_placement(placement)
        .build()
        .unwrap()
}

// --- expand_glob ---

#[test]
fn test_expand_glob_sorted_matches() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    let b = touch(root, "b.txt");
    let a = touch(root, "a.txt");
    touch(root, "c.md");
    let pattern = format!("{}/*.txt", root.display());
    assert_eq!(expand_glob(&pattern), vec![a, b]);
}

#[test]
fn test_expand_glob_in_subdirectories() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    let one = touch(root, "x/data.csv");
    let two = touch(root, "y/data.csv");
    touch(root, "y/other.csv");
    let pattern = format!("{}/*/data.csv", root.display());
    assert_eq!(expand_glob(&pattern), vec![one, two]);
}

#[test]
fn test_expand_glob_skips_hidden_unless_pattern_dotted() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    let shown = touch(root, "shown.txt");
    let hidden = touch(root, ".hidden.txt");
    assert_eq!(expand_glob(&format!("{}/*.txt", root.display())), vec![shown]);
    assert_eq!(expand_glob(&format!("{}/.*.txt", root.display())), vec![hidden]);
}

#[test]
fn test_expand_glob_skips_hidden_directories() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    let shown = touch(root, "a/x.txt");
    touch(root, ".cache/x.txt");
    assert_eq!(expand_glob(&format!("{}/*/x.txt", root.display())), vec![shown]);
}

#[test]
fn test_expand_glob_no_match() {
    let dir = tempfile::tempdir().unwrap();
    assert!(expand_glob(&format!("{}/*.none", dir.path().display())).is_empty());
}

#[test]
fn test_expand_glob_character_class() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    let one = touch(root, "img1.png");
    let two = touch(root, "img2.png");
    touch(root, "imgx.png");
    let pattern = format!("{}/img[0-9].png", root.display());
    assert_eq!(expand_glob(&pattern), vec![one, two]);
}

#[test]
fn test_expand_glob_star_does_not_cross_directories() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    let top = touch(root, "top.txt");
    touch(root, "nested/deep.txt");
    assert_eq!(expand_glob(&format!("{}/*.txt", root.display())), vec![top]);
}

#[test]
fn test_expand_glob_invalid_pattern_matches_nothing() {
    let dir = tempfile::tempdir().unwrap();
    touch(dir.path(), "a[b");
    assert!(expand_glob(&format!("{}/a[b", dir.path().display())).is_empty());
}

// --- order_candidates ---

#[test]
fn test_explicit_files_keep_argument_order() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    let c = touch(root, "c.txt");
    let a = touch(root, "a.txt");
    let b = touch(root, "b.txt");
    let cfg = config(root, false, Placement::Append);
    let got = order_candidates(&[arg(&c), arg(&a), arg(&b)], &cfg).unwrap();
    assert_eq!(got, vec![c, a, b]);
}

#[test]
fn test_discovered_appended_after_explicit() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    let explicit = touch(root, "z.txt");
    let d1 = touch(root, "tree/1.txt");
    let d2 = touch(root, "tree/2.txt");
    let cfg = config(root, true, Placement::Append);
    let got = order_candidates(&[arg(&root.join("tree")), arg(&explicit)], &cfg).unwrap();
    assert_eq!(got, vec![explicit, d1, d2]);
}

#[test]
fn test_discovered_prepended() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    let explicit = touch(root, "z.txt");
    let d1 = touch(root, "tree/1.txt");
    let cfg = config(root, true, Placement::Prepend);
    let got = order_candidates(&[arg(&explicit), arg(&root.join("tree"))], &cfg).unwrap();
    assert_eq!(got, vec![d1, explicit]);
}

#[test]
fn test_consecutive_duplicates_removed() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    let a = touch(root, "a.txt");
    let b = touch(root, "b.txt");
    let cfg = config(root, false, Placement::Append);
    let got = order_candidates(&[arg(&a), arg(&a), arg(&b), arg(&a)], &cfg).unwrap();
    // Only adjacent repeats collapse.
    assert_eq!(got, vec![a.clone(), b, a]);
}

#[test]
fn test_directory_without_recursive_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    touch(root, "tree/1.txt");
    let a = touch(root, "a.txt");
    let cfg = config(root, false, Placement::Append);
    let got = order_candidates(&[arg(&root.join("tree")), arg(&a)], &cfg).unwrap();
    assert_eq!(got, vec![a]);
}

// --- sequence ---

#[test]
fn test_sequence_applies_extension_filter_to_explicit_files() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    let keep = touch(root, "keep.txt");
    let drop = touch(root, "drop.bin");
    let cfg = RunConfig::builder()
        .num_workers(1)
        .target(TargetMode::NoTarget)
        .allowed_extensions([".txt"])
        .build()
        .unwrap();
    let list = sequence(&[arg(&drop), arg(&keep)], &cfg).unwrap();
    let inputs: Vec<&Path> = list.jobs.iter().map(|j| j.input_path()).collect();
    assert_eq!(inputs, vec![keep.as_path()]);
}

#[test]
fn test_sequence_missing_file_goes_to_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    let a = touch(root, "a.txt");
    let missing = root.join("missing.txt");
    let cfg = config(root, false, Placement::Append);
    let list = sequence(&[arg(&missing), arg(&a)], &cfg).unwrap();
    assert_eq!(list.jobs.len(), 1);
    assert_eq!(list.jobs[0].input_path(), a.as_path());
    assert_eq!(list.skipped.len(), 1);
    assert_eq!(list.skipped[0].input_path(), missing.as_path());
}

#[test]
fn test_sequence_empty_is_usage_error() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(dir.path(), false, Placement::Append);
    let err = sequence(&[], &cfg).unwrap_err();
    assert!(matches!(err, RunError::Usage(_)));
    assert_eq!(err.exit_code(), 2);
}

#[test]
fn test_sequence_empty_recursive_is_ok() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    fs::create_dir_all(root.join("empty")).unwrap();
    let cfg = config(root, true, Placement::Append);
    let list = sequence(&[arg(&root.join("empty"))], &cfg).unwrap();
    assert!(list.jobs.is_empty());
}

#[test]
fn test_sequence_glob_argument() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    let a = touch(root, "a.log");
    let b = touch(root, "b.log");
    touch(root, "c.txt");
    let cfg = config(root, false, Placement::Append);
    let list = sequence(&[format!("{}/*.log", root.display())], &cfg).unwrap();
    let inputs: Vec<PathBuf> = list.jobs.iter().map(|j| j.input_path().to_path_buf()).collect();
    assert_eq!(inputs, vec![a, b]);
}
