//! Sondear CLI
//!
//! Single-command activation-probing entry point for the sondear library.
//!
//! # Usage
//!
//! ```bash
//! # Write a demo checkpoint and probe specification
//! sondear init demo/
//!
//! # Attach taps, evaluate once, report per-channel statistics
//! sondear probe demo/probe.yaml
//!
//! # Export the statistics as CSV
//! sondear probe demo/probe.yaml --export stats.csv
//!
//! # Validate a specification
//! sondear validate demo/probe.yaml
//!
//! # Show checkpoint info
//! sondear info demo/sondear-demo.json
//! ```

use clap::Parser;
use sondear::cli::{run_command, Cli};
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run_command(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
