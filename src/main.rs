//! Netatmo Fetcher CLI application
//!
//! Command-line interface for downloading historical measurements from public
//! Netatmo weather stations, with an on-disk response cache and rate limiting.

use std::process;

use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use netatmo_fetcher::cli::{
    apply_overrides, handle_auth, handle_config, handle_export, handle_fetch, handle_stations,
    Cli, Commands, ConfigAction, ConfigArgs,
};
use netatmo_fetcher::config::AppConfig;
use netatmo_fetcher::errors::Result;

#[tokio::main]
async fn main() {
    let result = run().await;

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Main application logic
async fn run() -> Result<()> {
    // Load environment variables from .env file if it exists
    dotenv::dotenv().ok();

    let cli = Cli::parse_args();

    // `config init` must work before any config file exists
    let mut config = match &cli.command {
        Commands::Config(ConfigArgs {
            action: ConfigAction::Init { .. },
        }) => AppConfig::default(),
        _ => AppConfig::load(cli.global.config.clone()).await?,
    };
    apply_overrides(&mut config, &cli.global);

    init_logging(&cli, &config);

    info!("Netatmo Fetcher v{} starting", env!("CARGO_PKG_VERSION"));

    let quiet = cli.global.quiet;
    match cli.command {
        Commands::Stations(args) => {
            info!("Executing stations command");
            handle_stations(args, &config).await
        }
        Commands::Fetch(args) => {
            info!("Executing fetch command");
            handle_fetch(args, &config, quiet).await
        }
        Commands::Export(args) => {
            info!("Executing export command");
            handle_export(args, &config, quiet).await
        }
        Commands::Auth(args) => {
            info!("Executing auth command");
            handle_auth(args, &config).await
        }
        Commands::Config(args) => {
            info!("Executing config command");
            handle_config(args, &config, cli.global.config.clone()).await
        }
    }
}

/// Initialize logging from CLI verbosity, falling back to the configured level
fn init_logging(cli: &Cli, config: &AppConfig) {
    let level = cli
        .log_level()
        .map(|level| level.to_string().to_lowercase())
        .unwrap_or_else(|| config.logging.level.clone());

    let mut filter = EnvFilter::from_default_env();
    let mut rejected = None;
    match format!("netatmo_fetcher={}", level).parse() {
        Ok(directive) => filter = filter.add_directive(directive),
        Err(e) => rejected = Some(e),
    }

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(cli.global.very_verbose)
        .init();

    if let Some(e) = rejected {
        warn!("Ignoring invalid log level '{}': {}", level, e);
    }
    if cli.global.very_verbose {
        info!("Very verbose logging enabled");
    } else if cli.global.verbose {
        info!("Verbose logging enabled");
    }
}
