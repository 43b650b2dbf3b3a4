//! framelog - Single-file write-ahead log
//!
//! Appends, dumps, and verifies a framelog log file.

mod commands;
mod config;

use clap::{Parser, Subcommand};
use colored::Colorize;
use config::Config;
use framelog_wal::{RawCodec, Wal};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "framelog")]
#[command(about = "Single-file write-ahead log with checksummed frames")]
#[command(version)]
struct Cli {
    /// YAML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log file path (overrides the config file and FRAMELOG_PATH)
    #[arg(short, long)]
    path: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Append a record
    Append {
        /// Record JSON (or @file.json to read from file)
        value: String,

        /// Store the argument's bytes as-is instead of parsing JSON
        #[arg(long)]
        raw: bool,
    },

    /// Print every recoverable record
    Dump {
        /// Emit one JSON object per line
        #[arg(long)]
        json: bool,
    },

    /// Check the log without modifying it
    Verify,

    /// Truncate a damaged or corrupted tail back to the last valid record
    Repair,

    /// Delete the log file
    Remove,

    /// Print the effective configuration
    ShowConfig,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("{}: {}", "Error".red(), e);
            std::process::exit(1);
        }
    }
}

/// Runs a command. Returns `Ok(false)` when the command succeeded but found
/// the log damaged.
fn run(cli: Cli) -> Result<bool, Box<dyn std::error::Error>> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(path) = cli.path {
        config.log.path = path;
    }

    match cli.command {
        Commands::Append { value, raw } => {
            let mut wal = Wal::open(config.log.wal_config(), RawCodec)?;
            let result = commands::append(&mut wal, &value, raw)?;
            wal.close()?;
            println!("{}", result);
        }
        Commands::Dump { json } => {
            let mut wal = commands::open_existing(config.log.wal_config())?;
            let result = commands::dump(&mut wal, json)?;
            wal.close()?;
            println!("{}", result);
        }
        Commands::Verify => {
            let (report, clean) = commands::verify(&config.log.path)?;
            println!("{}", report);
            return Ok(clean);
        }
        Commands::Repair => {
            let mut wal = commands::open_existing(config.log.wal_config())?;
            let result = commands::repair(&mut wal)?;
            wal.close()?;
            println!("{}", result);
        }
        Commands::Remove => {
            println!("{}", commands::remove(&config.log.path)?);
        }
        Commands::ShowConfig => {
            print!("{}", config.to_yaml()?);
        }
    }

    Ok(true)
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
    fn test_parse_append() {
        let cli = Cli::try_parse_from(["framelog", "--path", "a.wal", "append", "--raw", "hi"])
            .unwrap();
        assert_eq!(cli.path, Some(PathBuf::from("a.wal")));
        assert!(matches!(
            cli.command,
            Commands::Append { ref value, raw: true } if value == "hi"
        ));
    }

    #[test]
    fn test_subcommand_required() {
        assert!(Cli::try_parse_from(["framelog"]).is_err());
    }
}
