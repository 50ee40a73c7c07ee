//! rasp-agent - probe package tooling

use clap::Parser;
use rasp_agent::cli::Cli;

fn main() {
    rasp_agent::logging::init();
    // Failures are already reported by `run`.
    if Cli::parse().run().is_err() {
        std::process::exit(1);
    }
}
