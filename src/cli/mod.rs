//! Command-line interface components
//!
//! This module contains CLI-specific code for the Netatmo Fetcher application,
//! including argument parsing, progress display, and command handlers.

pub mod args;
pub mod commands;
pub mod progress;

pub use args::{
    AuthAction, AuthArgs, Cli, Commands, ConfigAction, ConfigArgs, ExportArgs, FetchArgs,
    GlobalArgs, StationsArgs,
};
pub use commands::{
    apply_overrides, handle_auth, handle_config, handle_export, handle_fetch, handle_stations,
};
pub use progress::{ProgressDisplay, ProgressTally};
