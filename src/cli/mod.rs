use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use ismrmrd::dataset::DEFAULT_GROUP;

mod demo;
mod header;
mod info;
mod validate;

mod config;

/// ismrmrd-tool - inspect, validate and generate ISMRMRD raw-data files
#[derive(Parser)]
#[command(name = "ismrmrd-tool")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Verbosity level (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display counts and a header summary for one group
    Info {
        /// Dataset file path
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Group inside the file
        #[arg(short, long, default_value = DEFAULT_GROUP)]
        group: String,

        /// Print machine-readable JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the stored XML header of one group
    DumpHeader {
        /// Dataset file path
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Group inside the file
        #[arg(short, long, default_value = DEFAULT_GROUP)]
        group: String,
    },

    /// Decode an XML header file and print its canonical form
    CheckHeader {
        /// XML header file path
        #[arg(value_name = "XML")]
        xml: PathBuf,
    },

    /// Validate dataset consistency (exits non-zero on failure)
    Validate {
        /// Dataset file path
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Group inside the file
        #[arg(short, long, default_value = DEFAULT_GROUP)]
        group: String,
    },

    /// Write a synthetic Cartesian dataset
    Demo {
        /// Output dataset file path
        #[arg(value_name = "OUTPUT", default_value = "demo.bin")]
        output: PathBuf,

        /// Load demo geometry from a TOML config file
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,
    },
}

impl Cli {
    pub fn verbosity(&self) -> u8 {
        self.verbose
    }
}

pub fn init_logging(verbosity: u8) {
    let log_level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();
}

pub fn dispatch(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Info { file, group, json } => info::run(file, group, json),
        Commands::DumpHeader { file, group } => header::dump(file, group),
        Commands::CheckHeader { xml } => header::check(xml),
        Commands::Validate { file, group } => validate::run(file, group),
        Commands::Demo { output, config } => demo::run(output, config),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_subcommands() {
        let cli = Cli::parse_from(["ismrmrd-tool", "-vv", "info", "scan.bin", "--json"]);
        assert_eq!(cli.verbosity(), 2);
        match cli.command {
            Commands::Info { file, group, json } => {
                assert_eq!(file, PathBuf::from("scan.bin"));
                assert_eq!(group, "/dataset");
                assert!(json);
            }
            _ => panic!("expected info"),
        }

        let cli = Cli::parse_from(["ismrmrd-tool", "validate", "scan.bin", "-g", "/other"]);
        assert!(matches!(cli.command, Commands::Validate { group, .. } if group == "/other"));
    }
}
