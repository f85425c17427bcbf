//! polyreach command line interface
//!
//! Reads a model description from a file or standard input, runs the
//! requested analysis (reachability or parameter synthesis) and writes the
//! result to standard output, as plain text or JSON. Diagnostics go to
//! standard error; the exit code is non-zero on parse or computation
//! failure.

use clap::Parser;
use human_panic::setup_panic;
use log::info;

use cli::{initialize_logger, read_input, run_analysis, Cli};

mod cli;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    setup_panic!();

    let cli = Cli::parse();
    initialize_logger(cli.verbose)?;
    info!("polyreach {}", env!("CARGO_PKG_VERSION"));

    let input = read_input(cli.input.as_deref())?;
    run_analysis(&cli, &input)?;

    Ok(())
}
