use clap::{ArgGroup, Parser};
use std::path::PathBuf;

use crate::Verbosity;

/// Run an action over many files, mirroring their layout into an output directory.
#[derive(Clone, Debug, Parser)]
#[command(name = "batchrun", version)]
#[command(about = "Run a command per input file on a bounded worker pool.")]
#[command(group(ArgGroup::new("verbosity").multiple(false)))]
pub struct Cli {
    /// Files to act upon (wildcards ok). Directories need --recursive.
    #[arg(value_name = "FILES")]
    pub files: Vec<String>,

    /// Output root. Default: `<program>_<date>_<user>.<n>` in the current directory.
    #[arg(long, conflicts_with = "no_target")]
    pub target: Option<PathBuf>,

    /// Write new files in the current directory; do not preserve directory structure.
    #[arg(long)]
    pub no_target: bool,

    /// Source root whose layout is mirrored under the target.
    #[arg(long)]
    pub source: Option<PathBuf>,

    /// Keep the source root's own name under the target.
    #[arg(long)]
    pub keep_parent_name: bool,

    /// Recurse through any directories listed looking for valid files.
    #[arg(long, short = 'r')]
    pub recursive: bool,

    /// Maximum depth below each directory argument when recursing.
    #[arg(long)]
    pub max_depth: Option<usize>,

    /// Follow symbolic links when recursing.
    #[arg(long)]
    pub follow_links: bool,

    /// Put files found by recursion before the explicitly named ones.
    #[arg(long)]
    pub prepend_discovered: bool,

    /// Only act on files with these extensions. Can specify multiple: -e txt md
    #[arg(long = "ext", short = 'e', num_args = 1..)]
    pub extensions: Vec<String>,

    /// Maximum number of workers. Default: available parallelism.
    #[arg(long, short = 'p')]
    pub num_cpus: Option<usize>,

    /// Don't act on files; list what would run.
    #[arg(long = "no-action", visible_aliases = ["do-nothing", "dry-run"])]
    pub dry_run: bool,

    /// Read settings from this TOML file. Default: `.batchrun.toml` in the current directory, if present.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Write the effective settings to this TOML file before running.
    #[arg(long)]
    pub save_config: Option<PathBuf>,

    /// Sets logging level to DEBUG.
    #[arg(long, group = "verbosity")]
    pub debug: bool,

    /// Sets logging level to INFO [default].
    #[arg(long, group = "verbosity")]
    pub info: bool,

    /// Sets logging level to WARNING.
    #[arg(long, group = "verbosity")]
    pub quiet: bool,

    /// Sets logging level to ERROR and suppresses job output.
    #[arg(long, group = "verbosity")]
    pub silent: bool,

    /// Program to run after a successful run.
    #[arg(long)]
    pub next: Option<String>,

    /// Argument passed to the next stage. Repeat for several.
    #[arg(long = "next-arg", requires = "next", allow_hyphen_values = true)]
    pub next_args: Vec<String>,

    /// Rediscover inputs: with no FILES, recurse from --source (or the current directory).
    #[arg(long)]
    pub find: bool,

    /// Command template run per file, e.g. "gzip -kc {input}". Placeholders: {input},
    /// {input_dir}, {output_dir}, {protoname}, {ext}, {out:EXT}, {extra:KEY}.
    #[arg(long, short = 'x')]
    pub exec: Option<String>,
}

impl Cli {
    /// Verbosity selected on the command line, if any.
    pub fn verbosity(&self) -> Option<Verbosity> {
        if self.debug {
            Some(Verbosity::Debug)
        } else if self.info {
            Some(Verbosity::Info)
        } else if self.quiet {
            Some(Verbosity::Quiet)
        } else if self.silent {
            Some(Verbosity::Silent)
        } else {
            None
        }
    }
}
