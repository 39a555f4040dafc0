//! Batchrun CLI: run a command per input file; use --no-action to list without running.

use batchrun::engine::arg_parser::Cli;
use batchrun::engine::handle_run;
use clap::Parser;
use std::time::Instant;

fn main() {
    let start_time = Instant::now();
    let cli = Cli::parse();
    let code = handle_run(&cli);
    log::debug!("Total time: {:?}", start_time.elapsed());
    std::process::exit(code);
}
