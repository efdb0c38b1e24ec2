//! # argo-unroll CLI
//!
//! This is the binary entry point for the `argo-unroll` command-line tool.
//!
//! Its primary responsibilities are:
//! - Parsing command-line arguments using `clap`.
//! - Installing the logger.
//! - Running the render and turning failures into a non-zero exit status.
//!
//! The rendering logic lives in the `argo_unroll` library crate; the binary is
//! a thin wrapper around it.

mod cli;
mod logging;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    cli.execute()
}
