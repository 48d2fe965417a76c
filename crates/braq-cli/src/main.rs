//! # braq CLI
//!
//! Command-line interface for the Backlog Retrieval & Answer Kernel.
//!
//! This binary provides human-friendly access to `braq-core` functionality.
//! Run `braq --help` for usage information.

mod cli;
mod corpus;

use std::process::ExitCode;

fn main() -> ExitCode {
    cli::run()
}
