//! Application configuration constants.

use std::sync::OnceLock;

// ---- Package / paths (from CARGO_PKG_NAME, cached) ----

/// Package-derived names: built once from `CARGO_PKG_NAME`, then cached.
pub struct PackagePaths {
    pkg_name: &'static str,
    config_filename: String,
}

static PACKAGE_PATHS: OnceLock<PackagePaths> = OnceLock::new();

impl PackagePaths {
    /// Build and cache names from `CARGO_PKG_NAME`. Called once on first use.
    pub fn get() -> &'static PackagePaths {
        PACKAGE_PATHS.get_or_init(|| {
            let pkg = env!("CARGO_PKG_NAME");
            PackagePaths {
                pkg_name: pkg,
                config_filename: format!(".{pkg}.toml"),
            }
        })
    }

    pub fn pkg_name(&self) -> &str {
        self.pkg_name
    }

    /// Config file picked up from the working directory when `--config` is not given.
    pub fn config_filename(&self) -> &str {
        &self.config_filename
    }
}

// ---- Worker threads ----

/// File descriptors one worker may hold at once (child stdio pipes, action outputs).
pub const FDS_PER_WORKER: u64 = 10;

/// Soft `RLIMIT_NOFILE`; `None` when unlimited or unavailable.
#[cfg(unix)]
pub fn open_file_soft_limit() -> Option<u64> {
    let mut rlim = libc::rlimit {
        rlim_cur: 0,
        rlim_max: 0,
    };
    let rc = unsafe { libc::getrlimit(libc::RLIMIT_NOFILE, &mut rlim) };
    (rc == 0 && rlim.rlim_cur != libc::RLIM_INFINITY).then_some(rlim.rlim_cur as u64)
}

#[cfg(not(unix))]
pub fn open_file_soft_limit() -> Option<u64> {
    None
}

/// Workers that fit in 80% of `fd_limit`, at least one.
pub fn workers_for_fd_limit(fd_limit: u64) -> usize {
    let usable = fd_limit.saturating_mul(4) / 5;
    usize::try_from(usable / FDS_PER_WORKER)
        .unwrap_or(usize::MAX)
        .max(1)
}

/// Limits used to pick the default worker count.
#[derive(Clone, Copy, Debug)]
pub struct WorkerLimits {
    /// Available threads (from rayon); set by [`WorkerLimits::current()`].
    pub all_threads: usize,
    /// Cap derived from the open-file limit, when known.
    pub fd_cap: Option<usize>,
}

impl WorkerLimits {
    /// Snapshot of the current machine: rayon's thread count and the FD-derived cap.
    pub fn current() -> Self {
        Self {
            all_threads: rayon::current_num_threads(),
            fd_cap: open_file_soft_limit().map(workers_for_fd_limit),
        }
    }

    /// Worker count used when the caller did not request one.
    pub fn default_workers(&self) -> usize {
        let n = match self.fd_cap {
            Some(cap) if cap < self.all_threads => {
                log::debug!(
                    "Capping workers {} -> {} (FD limit ~80%)",
                    self.all_threads,
                    cap
                );
                cap
            }
            _ => self.all_threads,
        };
        n.max(1)
    }
}

// ---- Filesystem ----

/// Permission bits for created output directories.
pub const OUTPUT_DIR_MODE: u32 = 0o755;

/// Characters that turn an input argument into a glob pattern.
pub const GLOB_CHARS: [char; 3] = ['*', '?', '['];

/// Flag forwarded to a chained stage so it rediscovers its inputs.
pub const REDISCOVER_FLAG: &str = "--find";
