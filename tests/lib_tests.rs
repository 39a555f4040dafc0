use batchrun::engine::tools::{
    extension_allowed, extension_of, find_executable, is_current_dir, is_executable,
    is_glob_pattern, normal_components, protoname_of,
};
use batchrun::engine::is_hidden;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

// --- is_hidden ---

#[test]
fn test_is_hidden_dotfile() {
    assert!(is_hidden(Path::new("dir/.bashrc")));
    assert!(is_hidden(Path::new(".git")));
}

#[test]
fn test_is_hidden_plain_and_dot_dirs() {
    assert!(!is_hidden(Path::new("dir/notes.txt")));
    assert!(!is_hidden(Path::new(".")));
    assert!(!is_hidden(Path::new("..")));
    // Only the base name counts.
    assert!(!is_hidden(Path::new(".config/app.toml")));
}

// --- extension_of / protoname_of ---

#[test]
fn test_extension_and_protoname() {
    let p = Path::new("data/run.01.csv");
    assert_eq!(extension_of(p), "csv");
    assert_eq!(protoname_of(p), "run.01");
}

#[test]
fn test_extension_missing() {
    let p = Path::new("data/Makefile");
    assert_eq!(extension_of(p), "");
    assert_eq!(protoname_of(p), "Makefile");
}

#[test]
fn test_extension_allowed_none_allows_all() {
    assert!(extension_allowed(Path::new("a.bin"), None));
}

#[test]
fn test_extension_allowed_set() {
    let set: BTreeSet<String> = ["txt".to_string(), "md".to_string()].into();
    assert!(extension_allowed(Path::new("a.txt"), Some(&set)));
    assert!(!extension_allowed(Path::new("a.csv"), Some(&set)));
    assert!(!extension_allowed(Path::new("README"), Some(&set)));
}

// --- path components ---

#[test]
fn test_normal_components_drops_root_and_dots() {
    let parts = normal_components(Path::new("/a/./b/../c"));
    let parts: Vec<String> = parts
        .iter()
        .map(|p| p.to_string_lossy().into_owned())
        .collect();
    assert_eq!(parts, vec!["a", "b", "c"]);
}

#[test]
fn test_is_current_dir() {
    assert!(is_current_dir(Path::new(".")));
    assert!(is_current_dir(Path::new("")));
    assert!(is_current_dir(Path::new("./.")));
    assert!(!is_current_dir(Path::new("out")));
}

// --- is_glob_pattern ---

#[test]
fn test_is_glob_pattern() {
    assert!(is_glob_pattern("*.txt"));
    assert!(is_glob_pattern("dir/file?"));
    assert!(is_glob_pattern("x[12]"));
    assert!(!is_glob_pattern("plain/path.txt"));
}

// --- executables ---

#[cfg(unix)]
fn write_script(path: &Path, mode: u32) {
    use std::os::unix::fs::PermissionsExt;
    fs::write(path, "#!/bin/sh\n").unwrap();
    fs::set_permissions(path, fs::Permissions::from_mode(mode)).unwrap();
}

#[cfg(unix)]
#[test]
fn test_find_executable_searches_given_dirs_first() {
    let dir = tempfile::tempdir().unwrap();
    let tool = dir.path().join("batchrun-helper-tool");
    write_script(&tool, 0o755);
    let found = find_executable("batchrun-helper-tool", &[dir.path().to_path_buf()]).unwrap();
    assert_eq!(found, tool);
}

#[cfg(unix)]
#[test]
fn test_find_executable_skips_non_executable_files() {
    let dir = tempfile::tempdir().unwrap();
    let plain = dir.path().join("batchrun-plain-file");
    write_script(&plain, 0o644);
    assert!(!is_executable(&plain));
    let err = find_executable("batchrun-plain-file", &[dir.path().to_path_buf()]).unwrap_err();
    assert!(err.is_usage());
}

#[cfg(unix)]
#[test]
fn test_find_executable_checks_paths_as_given() {
    let dir = tempfile::tempdir().unwrap();
    let tool = dir.path().join("run.sh");
    write_script(&tool, 0o700);
    let given = tool.display().to_string();
    assert_eq!(find_executable(&given, &[]).unwrap(), tool);
    assert!(find_executable(&dir.path().join("absent.sh").display().to_string(), &[]).is_err());
    assert!(!is_executable(dir.path()));
}

#[cfg(unix)]
#[test]
fn test_find_executable_falls_back_to_path() {
    let found = find_executable("sh", &[]).unwrap();
    assert!(is_executable(&found), "{}", found.display());
}

#[test]
fn test_find_executable_unknown_program() {
    let err = find_executable("no-such-program-xyz", &[]).unwrap_err();
    assert!(err.to_string().contains("no-such-program-xyz"), "{err}");
}
