//! Command-line argument parsing for Netatmo Fetcher
//!
//! This module defines the CLI structure using clap derive macros,
//! providing station discovery, series fetching, CSV export,
//! authentication management, and configuration commands.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use crate::constants::{api, dataset};

/// Netatmo Fetcher - Download public weather station history
#[derive(Parser, Debug)]
#[command(
    name = "netatmo_fetcher",
    version,
    about = "Download historical measurements from public Netatmo weather stations",
    long_about = "Bulk historical downloader for public Netatmo weather stations.
Responses are cached on disk so repeated runs never download the same data twice,
and live requests are spaced out to stay within the API's request budget."
)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all subcommands
#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Very verbose logging (debug level)
    #[arg(long, global = true)]
    pub very_verbose: bool,

    /// Quiet mode - suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file path
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Directory holding the dataset cache directories
    #[arg(long, global = true, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Dataset name (overrides the configured one)
    #[arg(long, global = true, value_name = "NAME")]
    pub name: Option<String>,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the stations inside the configured area
    Stations(StationsArgs),

    /// Fetch one measurement type for one or all stations
    Fetch(FetchArgs),

    /// Fetch all stations and write one CSV file per station with data
    Export(ExportArgs),

    /// Manage authentication credentials
    Auth(AuthArgs),

    /// Manage the configuration file
    Config(ConfigArgs),
}

/// Arguments for the stations command
#[derive(Args, Debug, Clone)]
pub struct StationsArgs {
    /// Keep stations the API would filter out as implausible
    #[arg(long)]
    pub no_filter: bool,

    /// Show at most this many stations
    #[arg(short, long)]
    pub limit: Option<usize>,
}

/// Arguments for the fetch command
#[derive(Args, Debug, Clone)]
pub struct FetchArgs {
    /// Measurement type (pressure, temperature, humidity, ...)
    #[arg(short = 't', long = "type", default_value = "pressure")]
    pub measurement_type: String,

    /// Fetch a single station instead of all of them
    #[arg(short, long, value_name = "ID")]
    pub station: Option<String>,

    /// Pause after every live download (e.g. "8s", "500ms")
    #[arg(long, value_parser = parse_duration)]
    pub ratelimit: Option<Duration>,
}

/// Arguments for the export command
#[derive(Args, Debug, Clone)]
pub struct ExportArgs {
    /// Measurement type (pressure, temperature, humidity, ...)
    #[arg(short = 't', long = "type", default_value = "pressure")]
    pub measurement_type: String,

    /// Output directory for the CSV files
    #[arg(short, long, value_name = "DIR", default_value = dataset::DEFAULT_EXPORT_DIR)]
    pub output: PathBuf,

    /// Pause after every live download (e.g. "8s", "500ms")
    #[arg(long, value_parser = parse_duration)]
    pub ratelimit: Option<Duration>,
}

/// Arguments for authentication management
#[derive(Args, Debug)]
pub struct AuthArgs {
    #[command(subcommand)]
    pub action: AuthAction,
}

/// Authentication actions
#[derive(Subcommand, Debug)]
pub enum AuthAction {
    /// Set up Netatmo authentication credentials
    Setup {
        /// Force setup even if credentials exist
        #[arg(short, long)]
        force: bool,
    },

    /// Verify current credentials
    Verify,

    /// Show authentication status
    Status,

    /// Clear stored credentials
    Clear,
}

/// Arguments for configuration management
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Configuration actions
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Write a commented default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,

        /// Where to write (default: user config directory)
        #[arg(value_name = "FILE")]
        path: Option<PathBuf>,
    },

    /// Print the effective configuration
    Show,
}

fn parse_duration(value: &str) -> Result<Duration, String> {
    humantime::parse_duration(value).map_err(|e| format!("invalid duration '{}': {}", value, e))
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Logging level requested on the command line, if any
    pub fn log_level(&self) -> Option<tracing::Level> {
        if self.global.quiet {
            Some(tracing::Level::ERROR)
        } else if self.global.very_verbose {
            Some(tracing::Level::DEBUG)
        } else if self.global.verbose {
            Some(tracing::Level::INFO)
        } else {
            None
        }
    }
}

/// Whether a measurement type is one public stations are known to report
pub fn is_known_measurement_type(measurement_type: &str) -> bool {
    api::MEASUREMENT_TYPES.contains(&measurement_type)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_args_parse() {
        let cli = Cli::try_parse_from([
            "netatmo_fetcher",
            "--name",
            "netatmo-2022-01-15-17",
            "fetch",
            "--type",
            "temperature",
            "--station",
            "70:ee:50:3f:13:4c",
            "--ratelimit",
            "500ms",
        ])
        .unwrap();

        assert_eq!(cli.global.name.as_deref(), Some("netatmo-2022-01-15-17"));
        match cli.command {
            Commands::Fetch(args) => {
                assert_eq!(args.measurement_type, "temperature");
                assert_eq!(args.station.as_deref(), Some("70:ee:50:3f:13:4c"));
                assert_eq!(args.ratelimit, Some(Duration::from_millis(500)));
            }
            other => panic!("Expected fetch, got {:?}", other),
        }
    }

    #[test]
    fn test_export_defaults() {
        let cli = Cli::try_parse_from(["netatmo_fetcher", "export"]).unwrap();
        match cli.command {
            Commands::Export(args) => {
                assert_eq!(args.measurement_type, "pressure");
                assert_eq!(args.output, PathBuf::from("csv"));
                assert!(args.ratelimit.is_none());
            }
            other => panic!("Expected export, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_ratelimit_rejected() {
        let result = Cli::try_parse_from(["netatmo_fetcher", "fetch", "--ratelimit", "soon"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "netatmo_fetcher",
            "stations",
            "--no-filter",
            "--cache-dir",
            "/tmp/cache",
            "-q",
        ])
        .unwrap();

        assert_eq!(cli.global.cache_dir, Some(PathBuf::from("/tmp/cache")));
        assert_eq!(cli.log_level(), Some(tracing::Level::ERROR));
        assert!(matches!(
            cli.command,
            Commands::Stations(StationsArgs { no_filter: true, .. })
        ));
    }

    #[test]
    fn test_log_level() {
        let cli = Cli::try_parse_from(["netatmo_fetcher", "auth", "status"]).unwrap();
        assert_eq!(cli.log_level(), None);

        let cli = Cli::try_parse_from(["netatmo_fetcher", "-v", "config", "show"]).unwrap();
        assert_eq!(cli.log_level(), Some(tracing::Level::INFO));

        let cli = Cli::try_parse_from(["netatmo_fetcher", "--very-verbose", "auth", "verify"]).unwrap();
        assert_eq!(cli.log_level(), Some(tracing::Level::DEBUG));
    }

    #[test]
    fn test_known_measurement_types() {
        assert!(is_known_measurement_type("pressure"));
        assert!(!is_known_measurement_type("pressur"));
    }
}
