//! Descriptor factory: one [`JobDescriptor`] per input file, with its mirrored output directory.

use std::ffi::OsString;
use std::fmt;
use std::fs::DirBuilder;
use std::io;
use std::path::{Path, PathBuf};

use crate::engine::tools::{extension_of, is_current_dir, normal_components, protoname_of};
use crate::error::{RunError, RunResult};
use crate::{ExtraFields, ExtraValue, RunConfig};

/// Run-level inputs to the factory, borrowed from [`RunConfig`].
#[derive(Clone, Copy, Debug)]
pub struct DescriptorContext<'a> {
    pub source_dir: Option<&'a Path>,
    /// `None` = no-target mode.
    pub target: Option<&'a Path>,
    pub drop_parent_name: bool,
    pub extra_fields: &'a ExtraFields,
}

impl<'a> From<&'a RunConfig> for DescriptorContext<'a> {
    fn from(c: &'a RunConfig) -> Self {
        DescriptorContext {
            source_dir: c.source_dir(),
            target: c.resolved_target(),
            drop_parent_name: c.drop_parent_name(),
            extra_fields: c.extra_fields(),
        }
    }
}

/// One unit of work. Immutable once built; invalid descriptors are never dispatched.
#[derive(Clone, Debug, PartialEq)]
pub struct JobDescriptor {
    input_path: PathBuf,
    input_dir: PathBuf,
    file_extension: String,
    protoname: String,
    output_dir: PathBuf,
    extra_fields: ExtraFields,
    invalid_reason: Option<String>,
}

impl JobDescriptor {
    /// Build a descriptor, failing with [`RunError::PathNotFound`] when the input is missing.
    pub fn try_build(input_path: impl Into<PathBuf>, ctx: &DescriptorContext<'_>) -> RunResult<Self> {
        let input_path = input_path.into();
        log::debug!("Parsing filename {}", input_path.display());
        if !input_path.exists() {
            return Err(RunError::PathNotFound { path: input_path });
        }
        let mut descriptor = Self::derive(input_path, ctx);
        if !descriptor.input_path.is_file() {
            descriptor.invalid_reason = Some("not a regular file".to_string());
        }
        Ok(descriptor)
    }

    /// Build a descriptor; a missing or non-file input yields an invalid descriptor instead of an error.
    pub fn build(input_path: impl Into<PathBuf>, ctx: &DescriptorContext<'_>) -> Self {
        let input_path = input_path.into();
        match Self::try_build(input_path.clone(), ctx) {
            Ok(d) => {
                if let Some(reason) = &d.invalid_reason {
                    log::warn!("Skipping {}: {}", d.input_path.display(), reason);
                }
                d
            }
            Err(err) => {
                log::warn!("Skipping input: {}", err);
                let mut d = Self::derive(input_path, ctx);
                d.invalid_reason = Some(err.to_string());
                d
            }
        }
    }

    fn derive(input_path: PathBuf, ctx: &DescriptorContext<'_>) -> Self {
        let input_dir = input_dir_of(&input_path);
        let output_dir =
            mirror_output_dir(&input_path, ctx.source_dir, ctx.target, ctx.drop_parent_name);
        log::debug!(
            "{}: input_dir {}, output_dir {}",
            input_path.display(),
            input_dir.display(),
            output_dir.display()
        );
        JobDescriptor {
            file_extension: extension_of(&input_path),
            protoname: protoname_of(&input_path),
            input_dir,
            output_dir,
            extra_fields: ctx.extra_fields.clone(),
            input_path,
            invalid_reason: None,
        }
    }

    pub fn input_path(&self) -> &Path {
        &self.input_path
    }

    pub fn input_dir(&self) -> &Path {
        &self.input_dir
    }

    /// Suffix without the `.`; empty when the file has none.
    pub fn file_extension(&self) -> &str {
        &self.file_extension
    }

    /// Base file name without directory or extension.
    pub fn protoname(&self) -> &str {
        &self.protoname
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn extra_fields(&self) -> &ExtraFields {
        &self.extra_fields
    }

    pub fn extra(&self, key: &str) -> Option<&ExtraValue> {
        self.extra_fields.get(key)
    }

    pub fn is_valid(&self) -> bool {
        self.invalid_reason.is_none()
    }

    pub fn invalid_reason(&self) -> Option<&str> {
        self.invalid_reason.as_deref()
    }

    /// Output file path `output_dir/<protoname>.<ext>`.
    pub fn with_extension(&self, ext: &str) -> PathBuf {
        self.output_dir.join(format!("{}.{}", self.protoname, ext))
    }
}

impl fmt::Display for JobDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.input_path.display())
    }
}

/// Directory portion of `input_path`, `.` when it has none.
pub fn input_dir_of(input_path: &Path) -> PathBuf {
    match input_path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// `target` joined with `parts`; a current-dir target contributes nothing.
fn join_under(target: &Path, parts: &[OsString]) -> PathBuf {
    let mut out = if is_current_dir(target) {
        PathBuf::new()
    } else {
        target.to_path_buf()
    };
    out.extend(parts);
    if out.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        out
    }
}

/// Index just past the first occurrence of `needle` as a contiguous run in `haystack`.
fn find_after(haystack: &[OsString], needle: &[OsString]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|i| i + needle.len())
}

/// Output directory for `input_path`.
///
/// - no target (`None`): `.`
/// - `source_dir` found among the parent components: the components after it, under `target`
///   (with `drop_parent_name = false` the source root's own name is kept as the first one)
/// - otherwise `target` when it is not the current directory, else the input's own directory
pub fn mirror_output_dir(
    input_path: &Path,
    source_dir: Option<&Path>,
    target: Option<&Path>,
    drop_parent_name: bool,
) -> PathBuf {
    let Some(target) = target else {
        return PathBuf::from(".");
    };
    let input_dir = input_dir_of(input_path);
    let dir_parts = normal_components(&input_dir);

    if let Some(source) = source_dir {
        let source_parts = normal_components(source);
        if let Some(after) = find_after(&dir_parts, &source_parts) {
            let mut tail: Vec<OsString> = Vec::with_capacity(dir_parts.len() - after + 1);
            if !drop_parent_name && let Some(name) = source_parts.last() {
                tail.push(name.clone());
            }
            tail.extend_from_slice(&dir_parts[after..]);
            return join_under(target, &tail);
        }
    }

    if !is_current_dir(target) {
        target.to_path_buf()
    } else {
        input_dir
    }
}

/// Create `dir` (and missing parents) with mode 0755 unless it already exists.
///
/// Fails with [`RunError::DirectoryCreation`] when the directory still does not exist afterwards.
pub fn ensure_output_dir(dir: &Path) -> RunResult<()> {
    if dir.is_dir() {
        log::debug!("Output directory '{}' already exists", dir.display());
        return Ok(());
    }
    log::debug!("Creating directory '{}'", dir.display());
    let mut builder = DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use crate::utils::config::OUTPUT_DIR_MODE;
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(OUTPUT_DIR_MODE);
    }
    let created = builder.create(dir);
    if dir.is_dir() {
        return Ok(());
    }
    let source = match created {
        Err(e) => e,
        Ok(()) => io::Error::other("directory missing after creation"),
    };
    Err(RunError::DirectoryCreation {
        path: dir.to_path_buf(),
        source,
    })
}
