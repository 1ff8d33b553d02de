//! # ismrmrd-tool
//!
//! Command-line companion for ISMRMRD raw-data files.
//!
//! ## Usage
//!
//! ```bash
//! # Summarize a dataset
//! ismrmrd-tool info scan.bin --group /dataset
//!
//! # Print or check XML headers
//! ismrmrd-tool dump-header scan.bin
//! ismrmrd-tool check-header header.xml
//!
//! # Consistency report, non-zero exit on failure
//! ismrmrd-tool validate scan.bin
//!
//! # Generate a synthetic Cartesian scan
//! ismrmrd-tool demo phantom.bin --config demo.toml
//! ```

use anyhow::Result;
use clap::Parser;

mod cli;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    cli::init_logging(cli.verbosity());
    cli::dispatch(cli)
}
